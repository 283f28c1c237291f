use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{DealId, OrderId};
use tokio::sync::RwLock;

use crate::{
    NewOrder, OrderPatch, OrderRecord, Result, StoreError,
    store::{OrderStore, OrderTransaction},
};

#[derive(Debug, Default)]
struct InMemoryState {
    orders: BTreeMap<OrderId, OrderRecord>,
    next_id: i64,
    commits: usize,
    rollbacks: usize,
    fail_on_insert: bool,
    fail_on_link: bool,
    fail_on_patch: bool,
}

/// In-memory order store implementation for testing.
///
/// Inserted orders are staged in the transaction and only become visible to
/// readers on commit. Ids are drawn from a sequence that is never reused,
/// like a database sequence.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures inserts to fail.
    pub async fn set_fail_on_insert(&self, fail: bool) {
        self.state.write().await.fail_on_insert = fail;
    }

    /// Configures the deal back-fill to fail.
    pub async fn set_fail_on_link(&self, fail: bool) {
        self.state.write().await.fail_on_link = fail;
    }

    /// Configures patch application to fail.
    pub async fn set_fail_on_patch(&self, fail: bool) {
        self.state.write().await.fail_on_patch = fail;
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the number of committed transactions.
    pub async fn commit_count(&self) -> usize {
        self.state.read().await.commits
    }

    /// Returns the number of explicit rollbacks.
    pub async fn rollback_count(&self) -> usize {
        self.state.read().await.rollbacks
    }

    /// Inserts an already committed order, bypassing the transaction.
    pub async fn seed(&self, order: NewOrder, deal_id: Option<DealId>) -> OrderRecord {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let mut record = OrderRecord::pending(OrderId::new(state.next_id), &order, Utc::now());
        record.deal_id = deal_id;
        state.orders.insert(record.id, record.clone());
        record
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        Ok(InMemoryTransaction {
            state: Arc::clone(&self.state),
            staged: Vec::new(),
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn find_by_deal_id(&self, deal_id: &DealId) -> Result<Option<OrderRecord>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .find(|o| o.deal_id.as_ref() == Some(deal_id))
            .cloned())
    }

    async fn apply_patch(
        &self,
        deal_id: &DealId,
        patch: &OrderPatch,
    ) -> Result<Option<OrderRecord>> {
        let mut state = self.state.write().await;

        if state.fail_on_patch {
            return Err(StoreError::Unavailable("patch rejected".to_string()));
        }

        let Some(order) = state
            .orders
            .values_mut()
            .find(|o| o.deal_id.as_ref() == Some(deal_id))
        else {
            return Ok(None);
        };

        order.apply(patch);
        let updated = order.clone();
        state.commits += 1;
        Ok(Some(updated))
    }
}

/// Transaction handle for [`InMemoryOrderStore`].
#[derive(Debug)]
pub struct InMemoryTransaction {
    state: Arc<RwLock<InMemoryState>>,
    staged: Vec<OrderRecord>,
}

#[async_trait]
impl OrderTransaction for InMemoryTransaction {
    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderRecord> {
        let mut state = self.state.write().await;

        if state.fail_on_insert {
            return Err(StoreError::Unavailable("insert rejected".to_string()));
        }

        state.next_id += 1;
        let record = OrderRecord::pending(OrderId::new(state.next_id), order, Utc::now());
        self.staged.push(record.clone());
        Ok(record)
    }

    async fn link_deal(&mut self, id: OrderId, deal_id: &DealId) -> Result<()> {
        if self.state.read().await.fail_on_link {
            return Err(StoreError::Unavailable("link rejected".to_string()));
        }

        let order = self
            .staged
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(StoreError::OrderNotFound(id))?;
        order.deal_id = Some(deal_id.clone());
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let mut state = self.state.write().await;

        // Unique constraint simulation on deal_id
        for order in &self.staged {
            if let Some(deal_id) = &order.deal_id
                && state
                    .orders
                    .values()
                    .any(|o| o.deal_id.as_ref() == Some(deal_id))
            {
                return Err(StoreError::DuplicateDealId(deal_id.clone()));
            }
        }

        for order in self.staged {
            state.orders.insert(order.id, order);
        }
        state.commits += 1;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.state.write().await.rollbacks += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PatchValue;

    fn new_order() -> NewOrder {
        NewOrder {
            customer_id: "C-100".to_string(),
            customer_name: "Northern Auto".to_string(),
            pickup_location: "Calgary, AB".to_string(),
            dropoff_location: "Vancouver, BC".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_is_invisible_until_commit() {
        let store = InMemoryOrderStore::new();
        let mut tx = store.begin().await.unwrap();

        let order = tx.insert_order(&new_order()).await.unwrap();
        assert_eq!(order.id, OrderId::new(1));
        assert!(store.get_order(order.id).await.unwrap().is_none());

        tx.link_deal(order.id, &DealId::new("D-1")).await.unwrap();
        tx.commit().await.unwrap();

        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.deal_id, Some(DealId::new("D-1")));
        assert_eq!(store.commit_count().await, 1);
    }

    #[tokio::test]
    async fn rollback_discards_staged_orders() {
        let store = InMemoryOrderStore::new();
        let mut tx = store.begin().await.unwrap();
        let order = tx.insert_order(&new_order()).await.unwrap();

        tx.rollback().await.unwrap();

        assert!(store.get_order(order.id).await.unwrap().is_none());
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.rollback_count().await, 1);
    }

    #[tokio::test]
    async fn dropped_transaction_commits_nothing() {
        let store = InMemoryOrderStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_order(&new_order()).await.unwrap();
        }
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.commit_count().await, 0);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_rollback() {
        let store = InMemoryOrderStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&new_order()).await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let order = tx.insert_order(&new_order()).await.unwrap();
        assert_eq!(order.id, OrderId::new(2));
    }

    #[tokio::test]
    async fn duplicate_deal_id_is_rejected_on_commit() {
        let store = InMemoryOrderStore::new();
        store.seed(new_order(), Some(DealId::new("D-1"))).await;

        let mut tx = store.begin().await.unwrap();
        let order = tx.insert_order(&new_order()).await.unwrap();
        tx.link_deal(order.id, &DealId::new("D-1")).await.unwrap();

        let result = tx.commit().await;
        assert!(matches!(result, Err(StoreError::DuplicateDealId(_))));
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn link_unknown_order_fails() {
        let store = InMemoryOrderStore::new();
        let mut tx = store.begin().await.unwrap();
        let result = tx.link_deal(OrderId::new(99), &DealId::new("D-9")).await;
        assert!(matches!(result, Err(StoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn fail_on_insert() {
        let store = InMemoryOrderStore::new();
        store.set_fail_on_insert(true).await;
        let mut tx = store.begin().await.unwrap();
        assert!(tx.insert_order(&new_order()).await.is_err());
    }

    #[tokio::test]
    async fn apply_patch_by_deal_id() {
        let store = InMemoryOrderStore::new();
        store.seed(new_order(), Some(DealId::new("D-7"))).await;

        let patch = OrderPatch {
            carrier_name: Some(PatchValue::Set("Fast Haul".to_string())),
            ..OrderPatch::default()
        };
        let updated = store
            .apply_patch(&DealId::new("D-7"), &patch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.carrier_name.as_deref(), Some("Fast Haul"));

        let missing = store
            .apply_patch(&DealId::new("D-missing"), &patch)
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
