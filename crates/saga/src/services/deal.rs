//! Creation of the CRM deal mirroring a local order.

use std::sync::Arc;

use common::DealId;
use crm::{CrmClient, CrmError, DEALS_MODULE, RecordResult};
use order_store::OrderRecord;
use serde_json::{Map, Value, json};

use crate::jurisdiction::tax_province;
use crate::request::OrderRequest;

/// Builds the deal fields for an order.
pub fn deal_payload(order: &OrderRecord, request: &OrderRequest) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("Deal_Name".to_string(), json!(order.id.label()));
    fields.insert("Customer_id".to_string(), json!(order.customer_id));
    fields.insert("Customer_Name".to_string(), json!(order.customer_name));
    fields.insert("PickupLocation".to_string(), json!(order.pickup_location));
    fields.insert("Drop_off_Location".to_string(), json!(order.dropoff_location));
    fields.insert(
        "special_instructon".to_string(),
        json!(request.special_instruction),
    );
    fields.insert(
        "Tax_Province".to_string(),
        json!(tax_province(&order.pickup_location)),
    );
    fields
}

/// Creates deals in the CRM.
#[derive(Clone)]
pub struct DealCreator {
    crm: Arc<dyn CrmClient>,
}

impl DealCreator {
    pub fn new(crm: Arc<dyn CrmClient>) -> Self {
        Self { crm }
    }

    /// Creates the deal for `order` and returns its CRM id.
    #[tracing::instrument(skip(self, order, request), fields(order_id = %order.id))]
    pub async fn create(
        &self,
        order: &OrderRecord,
        request: &OrderRequest,
    ) -> Result<DealId, CrmError> {
        let results = self
            .crm
            .create_records(DEALS_MODULE, vec![deal_payload(order, request)])
            .await?;

        match results.into_iter().next() {
            Some(RecordResult::Created(id)) => {
                tracing::info!(deal_id = %id, "deal created");
                Ok(DealId::new(id))
            }
            Some(RecordResult::Failed { code, message }) => {
                Err(CrmError::Rejected(format!("{code}: {message}")))
            }
            None => Err(CrmError::MalformedResponse(
                "no result for created deal".to_string(),
            )),
        }
    }
}
