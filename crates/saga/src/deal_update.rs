//! Forwarding of field updates to an existing CRM deal.

use std::sync::Arc;

use crm::{CrmClient, DEALS_MODULE};
use serde_json::Value;

use crate::error::DealUpdateError;
use crate::request::{DEAL_ID_KEY, deal_id_from};
use crate::response::{CODE_OK, DealUpdateResponse, DealUpdated};

/// Pushes caller-supplied field changes to a deal in the CRM.
#[derive(Clone)]
pub struct RemoteDealUpdater {
    crm: Arc<dyn CrmClient>,
}

impl RemoteDealUpdater {
    pub fn new(crm: Arc<dyn CrmClient>) -> Self {
        Self { crm }
    }

    /// Sends every field of `body` except `DealID` to the deal it names.
    #[tracing::instrument(skip(self, body))]
    pub async fn update(&self, body: Value) -> DealUpdateResponse {
        match self.forward(body).await {
            Ok(data) => DealUpdateResponse::Updated(DealUpdated {
                status: "success".to_string(),
                code: CODE_OK,
                data,
            }),
            Err(e) => {
                tracing::error!(error = %e, "deal update failed");
                DealUpdateResponse::Failed(e.into_failure())
            }
        }
    }

    async fn forward(&self, body: Value) -> Result<Value, DealUpdateError> {
        let Value::Object(mut fields) = body else {
            return Err(DealUpdateError::MissingDealId);
        };
        let deal_id = deal_id_from(&fields).ok_or(DealUpdateError::MissingDealId)?;
        fields.remove(DEAL_ID_KEY);

        let data = self
            .crm
            .update_record(DEALS_MODULE, deal_id.as_str(), fields)
            .await?;
        tracing::info!(%deal_id, "deal updated");
        Ok(data)
    }
}
