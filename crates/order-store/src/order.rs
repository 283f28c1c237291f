use chrono::{DateTime, Utc};
use common::{DealId, OrderId};
use serde::{Deserialize, Serialize};

/// Status every order starts with when it is first inserted.
pub const INITIAL_STATUS: &str = "Pending";

/// Fields needed to insert a new order row.
///
/// Missing request fields arrive here as empty strings, matching the
/// column defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: String,
    pub customer_name: String,
    pub pickup_location: String,
    pub dropoff_location: String,
}

/// A persisted order row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub customer_id: String,
    pub customer_name: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub status: Option<String>,
    /// CRM deal id; `None` until the deal has been created and linked.
    pub deal_id: Option<DealId>,
    pub estimated_pickup_time: Option<DateTime<Utc>>,
    pub estimated_dropoff_time: Option<DateTime<Utc>>,
    pub actual_pickup_time: Option<DateTime<Utc>>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub carrier_id: Option<String>,
    pub carrier_name: Option<String>,
    pub customer_price: Option<f64>,
    pub carrier_cost: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Builds a freshly inserted record with the initial status.
    pub fn pending(id: OrderId, new: &NewOrder, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            customer_id: new.customer_id.clone(),
            customer_name: new.customer_name.clone(),
            pickup_location: new.pickup_location.clone(),
            dropoff_location: new.dropoff_location.clone(),
            status: Some(INITIAL_STATUS.to_string()),
            deal_id: None,
            estimated_pickup_time: None,
            estimated_dropoff_time: None,
            actual_pickup_time: None,
            actual_delivery_time: None,
            carrier_id: None,
            carrier_name: None,
            customer_price: None,
            carrier_cost: None,
            created_at,
        }
    }

    /// Applies every present field of the patch to this record.
    pub fn apply(&mut self, patch: &OrderPatch) {
        fn set<T: Clone>(target: &mut Option<T>, update: &Option<PatchValue<T>>) {
            match update {
                Some(PatchValue::Set(value)) => *target = Some(value.clone()),
                Some(PatchValue::Clear) => *target = None,
                None => {}
            }
        }

        set(&mut self.status, &patch.status);
        set(&mut self.estimated_pickup_time, &patch.estimated_pickup_time);
        set(&mut self.estimated_dropoff_time, &patch.estimated_dropoff_time);
        set(&mut self.actual_pickup_time, &patch.actual_pickup_time);
        set(&mut self.actual_delivery_time, &patch.actual_delivery_time);
        set(&mut self.carrier_id, &patch.carrier_id);
        set(&mut self.carrier_name, &patch.carrier_name);
        set(&mut self.customer_price, &patch.customer_price);
        set(&mut self.carrier_cost, &patch.carrier_cost);
    }
}

/// A single field update within an [`OrderPatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum PatchValue<T> {
    /// Store the given value.
    Set(T),
    /// Store SQL NULL.
    Clear,
}

/// Partial update of the reconciliation columns of an order.
///
/// A `None` field is left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderPatch {
    pub status: Option<PatchValue<String>>,
    pub estimated_pickup_time: Option<PatchValue<DateTime<Utc>>>,
    pub estimated_dropoff_time: Option<PatchValue<DateTime<Utc>>>,
    pub actual_pickup_time: Option<PatchValue<DateTime<Utc>>>,
    pub actual_delivery_time: Option<PatchValue<DateTime<Utc>>>,
    pub carrier_id: Option<PatchValue<String>>,
    pub carrier_name: Option<PatchValue<String>>,
    pub customer_price: Option<PatchValue<f64>>,
    pub carrier_cost: Option<PatchValue<f64>>,
}

impl OrderPatch {
    /// Returns true if the patch touches no column.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
