//! Saga pattern implementation for transport order creation.
//!
//! The order creation saga follows these steps:
//! 1. Normalize release form references
//! 2. Insert the order inside an open transaction
//! 3. Create the CRM deal
//! 4. Attach release forms to the deal
//! 5. Create the vehicle records
//! 6. Attach each vehicle's release form
//! 7. Link the deal id and commit
//! 8. Announce the order
//!
//! Failures up to step 3 leave no trace. Failures after the deal exists roll
//! back the local order and report the deal as orphaned; remote writes are
//! never compensated.
//!
//! The crate also holds the two update flows: reconciliation of CRM changes
//! into the order store and forwarding of deal updates to the CRM.

pub mod coordinator;
pub mod deal_update;
pub mod error;
pub mod jurisdiction;
pub mod normalizer;
pub mod reconcile;
pub mod request;
pub mod response;
pub mod services;
pub mod settings;
pub mod step;

pub use coordinator::SagaCoordinator;
pub use deal_update::RemoteDealUpdater;
pub use error::{AttachmentError, DealUpdateError, NormalizeError, ReconcileError, SagaError};
pub use jurisdiction::tax_province;
pub use normalizer::{LocatorResolver, normalize_release_forms};
pub use reconcile::{ReconciliationUpdater, UPDATABLE_FIELDS, parse_patch};
pub use request::{OrderRequest, VehicleRequest};
pub use response::{
    DealUpdateResponse, DealUpdated, FailurePayload, OrderCreated, OrderResponse,
    ReconcileResponse, StatusPayload,
};
pub use settings::{SagaSettings, VehicleLayout};
pub use step::SagaStep;
