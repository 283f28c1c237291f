//! Request shapes accepted by the saga.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use common::DealId;
use order_store::NewOrder;

/// Key carrying the CRM deal id in update bodies.
pub const DEAL_ID_KEY: &str = "DealID";

/// Reads the deal id of an update body.
///
/// Accepts a string or a number; an empty string counts as missing.
pub fn deal_id_from(body: &Map<String, Value>) -> Option<DealId> {
    match body.get(DEAL_ID_KEY)? {
        Value::String(id) if !id.trim().is_empty() => Some(DealId::new(id.trim())),
        Value::Number(id) => Some(DealId::new(id.to_string())),
        _ => None,
    }
}

/// A transport order request as submitted by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    #[serde(rename = "Customer_id", default)]
    pub customer_id: String,
    #[serde(rename = "Customer_name", default)]
    pub customer_name: String,
    #[serde(rename = "Pickup_Location", default)]
    pub pickup_location: String,
    #[serde(rename = "Dropoff_Location", default)]
    pub dropoff_location: String,
    #[serde(rename = "Special_Instruction", default)]
    pub special_instruction: String,
    #[serde(rename = "Vehicles", default)]
    pub vehicles: Vec<VehicleRequest>,
}

impl OrderRequest {
    /// Returns the fields persisted in the order row.
    pub fn new_order(&self) -> NewOrder {
        NewOrder {
            customer_id: self.customer_id.clone(),
            customer_name: self.customer_name.clone(),
            pickup_location: self.pickup_location.clone(),
            dropoff_location: self.dropoff_location.clone(),
        }
    }
}

/// One vehicle of an order request.
///
/// Attributes other than the ones named here are CRM fields and are passed
/// through to the vehicle record unchanged. `ReleaseForm` is kept as raw JSON
/// so a malformed reference only costs the attachment, not the order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleRequest {
    #[serde(rename = "Make", default)]
    pub make: String,
    #[serde(rename = "Model", default)]
    pub model: String,
    #[serde(rename = "Trim", default)]
    pub trim: String,
    #[serde(rename = "VIN", default)]
    pub vin: String,
    #[serde(rename = "ReleaseForm", default)]
    pub release_form: Option<Value>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl VehicleRequest {
    /// Returns the display name used for the CRM record.
    pub fn display_name(&self) -> String {
        format!("{} {} {} - {}", self.make, self.model, self.trim, self.vin)
    }
}
