//! Saga error types.

use common::DealId;
use crm::{CrmError, FetchError};
use order_store::StoreError;
use thiserror::Error;

use crate::response::FailurePayload;
use crate::step::SagaStep;

/// Message returned to the caller for every failed order creation.
pub const CREATE_FAILURE_MESSAGE: &str = "Error creating order";

/// Message returned to the caller for every failed reconciliation.
pub const RECONCILE_FAILURE_MESSAGE: &str = "Error Updating Order";

/// Message returned to the caller for every failed remote deal update.
pub const DEAL_UPDATE_FAILURE_MESSAGE: &str = "Error updating order";

/// A release form reference that could not be turned into a locator.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Invalid release form reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },
}

/// Failure to attach one document. Never fatal to the saga.
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Could not resolve attachment: {0}")]
    Locator(#[from] NormalizeError),

    #[error("Could not retrieve attachment: {0}")]
    Fetch(#[from] FetchError),

    #[error("Could not upload attachment: {0}")]
    Upload(#[from] CrmError),
}

/// Fatal errors of the order creation saga.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The order row could not be inserted. Nothing was written remotely.
    #[error("DB order creation failed: {0}")]
    OrderPersistence(#[source] StoreError),

    /// The CRM deal could not be created. The local order was rolled back.
    #[error("CRM deal creation failed: {0}")]
    DealCreation(#[source] CrmError),

    /// The batch vehicle call failed after the deal was created. The local
    /// order was rolled back; the remote deal is left orphaned.
    #[error("CRM vehicle creation failed for deal {deal_id}: {source}")]
    VehicleCreation { deal_id: DealId, source: CrmError },

    /// The deal id could not be recorded or the transaction not committed.
    /// The remote deal is left orphaned.
    #[error("Linking deal {deal_id} to the order failed: {source}")]
    LinkDeal { deal_id: DealId, source: StoreError },

    /// The request could not be interpreted.
    #[error("Invalid order request: {0}")]
    InvalidRequest(String),
}

impl SagaError {
    /// Returns the step at which the saga stopped.
    pub fn step(&self) -> SagaStep {
        match self {
            SagaError::OrderPersistence(_) => SagaStep::PersistOrder,
            SagaError::DealCreation(_) => SagaStep::CreateDeal,
            SagaError::VehicleCreation { .. } => SagaStep::RegisterVehicles,
            SagaError::LinkDeal { .. } => SagaStep::LinkDeal,
            SagaError::InvalidRequest(_) => SagaStep::ParseRequest,
        }
    }

    /// Returns the remote deal left without a local order, if any.
    pub fn orphaned_deal(&self) -> Option<&DealId> {
        match self {
            SagaError::VehicleCreation { deal_id, .. } | SagaError::LinkDeal { deal_id, .. } => {
                Some(deal_id)
            }
            _ => None,
        }
    }

    /// Converts the error into the public failure payload.
    pub fn into_failure(self) -> FailurePayload {
        FailurePayload::internal(self.to_string(), CREATE_FAILURE_MESSAGE)
    }
}

/// Errors of the reconciliation updater.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The body is not a JSON object.
    #[error("Invalid reconciliation body: {0}")]
    InvalidBody(String),

    /// A whitelisted field carried a value of the wrong shape.
    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// The store failed to apply the patch.
    #[error("{0}")]
    Store(#[from] StoreError),
}

impl ReconcileError {
    /// Converts the error into the public failure payload.
    pub fn into_failure(self) -> FailurePayload {
        FailurePayload::internal(self.to_string(), RECONCILE_FAILURE_MESSAGE)
    }
}

/// Errors of the remote deal updater.
#[derive(Debug, Error)]
pub enum DealUpdateError {
    #[error("DealID is required")]
    MissingDealId,

    #[error("{0}")]
    Crm(#[from] CrmError),
}

impl DealUpdateError {
    /// Converts the error into the public failure payload.
    pub fn into_failure(self) -> FailurePayload {
        FailurePayload::internal(self.to_string(), DEAL_UPDATE_FAILURE_MESSAGE)
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_request_fails_at_parse_step() {
        let error = SagaError::InvalidRequest("invalid type: string, expected a sequence".into());
        assert_eq!(error.step(), SagaStep::ParseRequest);
        assert_eq!(error.orphaned_deal(), None);
    }

    #[test]
    fn remote_failures_after_the_deal_report_it_as_orphaned() {
        let error = SagaError::VehicleCreation {
            deal_id: DealId::new("D-1"),
            source: CrmError::Rejected("batch refused".into()),
        };
        assert_eq!(error.step(), SagaStep::RegisterVehicles);
        assert_eq!(error.orphaned_deal(), Some(&DealId::new("D-1")));

        let failure = error.into_failure();
        assert_eq!(failure.code, 500);
        assert_eq!(failure.message, CREATE_FAILURE_MESSAGE);
    }
}
