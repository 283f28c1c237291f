use common::{DealId, OrderId};
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order was not found in the current transaction or the store.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Another committed order is already linked to this deal.
    #[error("Deal {0} is already linked to another order")]
    DuplicateDealId(DealId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The store refused the operation (used by the in-memory store).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
