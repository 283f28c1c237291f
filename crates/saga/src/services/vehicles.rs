//! Registration of vehicle records under a CRM deal.

use std::sync::Arc;

use common::{DealId, VehicleId};
use crm::{CrmClient, CrmError, RecordResult, VEHICLES_MODULE};
use order_store::{INITIAL_STATUS, OrderRecord};
use serde_json::{Map, Value, json};

use crate::request::VehicleRequest;
use crate::settings::VehicleLayout;

const VEHICLE_SOURCE: &str = "Transport Request";

/// Keys sent to the CRM but left out of the caller's response.
const REQUEST_ONLY_KEYS: [&str; 2] = ["Layout", "Source"];

/// A vehicle after the batch create call.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredVehicle {
    /// CRM id, or `None` if the CRM rejected this record.
    pub vehicle_id: Option<VehicleId>,
    /// Fields submitted to the CRM.
    pub fields: Map<String, Value>,
}

/// Builds the CRM fields of one vehicle.
///
/// The request descriptor is left untouched; pass-through attributes are
/// copied first so the derived fields always win.
pub fn vehicle_payload(
    vehicle: &VehicleRequest,
    deal_id: &DealId,
    order: &OrderRecord,
    layout: &VehicleLayout,
) -> Map<String, Value> {
    let mut fields = vehicle.attributes.clone();
    fields.insert("Make".to_string(), json!(vehicle.make));
    fields.insert("Model".to_string(), json!(vehicle.model));
    fields.insert("Trim".to_string(), json!(vehicle.trim));
    fields.insert("VIN".to_string(), json!(vehicle.vin));
    if let Some(form) = &vehicle.release_form {
        fields.insert("ReleaseForm".to_string(), form.clone());
    }
    fields.insert(
        "Layout".to_string(),
        json!({ "name": layout.name, "id": layout.id }),
    );
    fields.insert("Name".to_string(), json!(vehicle.display_name()));
    fields.insert("Source".to_string(), json!(VEHICLE_SOURCE));
    fields.insert("Order_Status".to_string(), json!(INITIAL_STATUS));
    fields.insert("Deal_ID".to_string(), json!(deal_id));
    fields.insert("Pickup_Location".to_string(), json!(order.pickup_location));
    fields.insert("Dropoff_Location".to_string(), json!(order.dropoff_location));
    fields
}

/// Builds the response record of a registered vehicle.
pub fn output_record(vehicle: &RegisteredVehicle) -> Map<String, Value> {
    let mut record = vehicle.fields.clone();
    for key in REQUEST_ONLY_KEYS {
        record.remove(key);
    }
    record.insert("Vehicle_ID".to_string(), json!(vehicle.vehicle_id));
    record
}

/// Creates vehicle records in the CRM.
#[derive(Clone)]
pub struct VehicleRegistrar {
    crm: Arc<dyn CrmClient>,
    layout: VehicleLayout,
}

impl VehicleRegistrar {
    pub fn new(crm: Arc<dyn CrmClient>, layout: VehicleLayout) -> Self {
        Self { crm, layout }
    }

    /// Creates all vehicles of an order in one batch call.
    ///
    /// Fails only if the call itself fails. Records the CRM rejects
    /// individually come back with no vehicle id. An empty list makes no call.
    #[tracing::instrument(skip(self, order, vehicles), fields(deal_id = %deal_id, count = vehicles.len()))]
    pub async fn register(
        &self,
        deal_id: &DealId,
        order: &OrderRecord,
        vehicles: &[VehicleRequest],
    ) -> Result<Vec<RegisteredVehicle>, CrmError> {
        if vehicles.is_empty() {
            return Ok(Vec::new());
        }

        let payloads: Vec<Map<String, Value>> = vehicles
            .iter()
            .map(|v| vehicle_payload(v, deal_id, order, &self.layout))
            .collect();

        let results = self
            .crm
            .create_records(VEHICLES_MODULE, payloads.clone())
            .await?;

        if results.len() != payloads.len() {
            tracing::warn!(
                submitted = payloads.len(),
                returned = results.len(),
                "vehicle result count mismatch"
            );
        }

        let registered = payloads
            .into_iter()
            .enumerate()
            .map(|(index, fields)| {
                let vehicle_id = match results.get(index) {
                    Some(RecordResult::Created(id)) => Some(VehicleId::new(id.as_str())),
                    Some(RecordResult::Failed { code, message }) => {
                        tracing::warn!(index, %code, %message, "vehicle record rejected");
                        None
                    }
                    None => None,
                };
                RegisteredVehicle { vehicle_id, fields }
            })
            .collect();

        Ok(registered)
    }
}
