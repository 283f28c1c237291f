use async_trait::async_trait;
use common::{DealId, OrderId};

use crate::{NewOrder, OrderPatch, OrderRecord, Result};

/// Core trait for order persistence.
///
/// Order creation goes through an explicit [`OrderTransaction`] so the caller
/// can interleave remote calls between the insert and the commit. All
/// implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// The transaction handle returned by [`OrderStore::begin`].
    type Transaction: OrderTransaction;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Transaction>;

    /// Loads a committed order by its store id.
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Loads a committed order by its linked CRM deal id.
    async fn find_by_deal_id(&self, deal_id: &DealId) -> Result<Option<OrderRecord>>;

    /// Applies a patch to the order linked to `deal_id` and commits.
    ///
    /// Returns the updated record, or `None` if no order is linked to the deal.
    async fn apply_patch(&self, deal_id: &DealId, patch: &OrderPatch)
    -> Result<Option<OrderRecord>>;
}

/// An open unit of work on the order store.
///
/// Dropping a transaction without calling [`OrderTransaction::commit`] rolls
/// it back, so no exit path can leave it open.
#[async_trait]
pub trait OrderTransaction: Send {
    /// Inserts a new order with the initial status and returns it with its
    /// store-assigned id. The row is not visible to other readers until commit.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderRecord>;

    /// Records the CRM deal id on an order inserted in this transaction.
    async fn link_deal(&mut self, id: OrderId, deal_id: &DealId) -> Result<()>;

    /// Commits all changes made in this transaction.
    async fn commit(self) -> Result<()>;

    /// Discards all changes made in this transaction.
    async fn rollback(self) -> Result<()>;
}
