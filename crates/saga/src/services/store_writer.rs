//! Creation of the local order row.

use order_store::{NewOrder, OrderRecord, OrderStore, OrderTransaction, StoreError};

/// Opens a transaction and inserts a pending order into it.
///
/// On success the transaction is returned still open so the caller can link
/// the remote deal before committing. On failure the transaction has already
/// been rolled back.
#[tracing::instrument(skip(store, order), fields(customer_id = %order.customer_id))]
pub async fn open_order<S: OrderStore>(
    store: &S,
    order: &NewOrder,
) -> Result<(S::Transaction, OrderRecord), StoreError> {
    let mut tx = store.begin().await?;

    match tx.insert_order(order).await {
        Ok(record) => {
            tracing::info!(order_id = %record.id, "order row inserted");
            Ok((tx, record))
        }
        Err(e) => {
            if let Err(rollback_error) = tx.rollback().await {
                tracing::warn!(error = %rollback_error, "rollback after failed insert failed");
            }
            Err(e)
        }
    }
}
