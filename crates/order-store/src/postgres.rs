use async_trait::async_trait;
use common::{DealId, OrderId};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{
    NewOrder, OrderPatch, OrderRecord, Result, StoreError,
    order::INITIAL_STATUS,
    store::{OrderStore, OrderTransaction},
};

const ORDER_COLUMNS: &str = "id, customer_id, customer_name, pickup_location, dropoff_location, \
     status, deal_id, estimated_pickup_time, estimated_dropoff_time, actual_pickup_time, \
     actual_delivery_time, carrier_id, carrier_name, customer_price, carrier_cost, created_at";

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn row_to_order(row: PgRow) -> Result<OrderRecord> {
    Ok(OrderRecord {
        id: OrderId::new(row.try_get("id")?),
        customer_id: row.try_get("customer_id")?,
        customer_name: row.try_get("customer_name")?,
        pickup_location: row.try_get("pickup_location")?,
        dropoff_location: row.try_get("dropoff_location")?,
        status: row.try_get("status")?,
        deal_id: row
            .try_get::<Option<String>, _>("deal_id")?
            .map(DealId::from),
        estimated_pickup_time: row.try_get("estimated_pickup_time")?,
        estimated_dropoff_time: row.try_get("estimated_dropoff_time")?,
        actual_pickup_time: row.try_get("actual_pickup_time")?,
        actual_delivery_time: row.try_get("actual_delivery_time")?,
        carrier_id: row.try_get("carrier_id")?,
        carrier_name: row.try_get("carrier_name")?,
        customer_price: row.try_get("customer_price")?,
        carrier_cost: row.try_get("carrier_cost")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_deal_conflict(e: sqlx::Error, deal_id: &DealId) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.constraint() == Some("unique_order_deal_id")
    {
        return StoreError::DuplicateDealId(deal_id.clone());
    }
    StoreError::Database(e)
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_order).transpose()
    }

    async fn find_by_deal_id(&self, deal_id: &DealId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE deal_id = $1"
        ))
        .bind(deal_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_order).transpose()
    }

    async fn apply_patch(
        &self,
        deal_id: &DealId,
        patch: &OrderPatch,
    ) -> Result<Option<OrderRecord>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE deal_id = $1 FOR UPDATE"
        ))
        .bind(deal_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut order = row_to_order(row)?;
        order.apply(patch);

        sqlx::query(
            r#"
            UPDATE orders SET
                status = $2,
                estimated_pickup_time = $3,
                estimated_dropoff_time = $4,
                actual_pickup_time = $5,
                actual_delivery_time = $6,
                carrier_id = $7,
                carrier_name = $8,
                customer_price = $9,
                carrier_cost = $10
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_i64())
        .bind(&order.status)
        .bind(order.estimated_pickup_time)
        .bind(order.estimated_dropoff_time)
        .bind(order.actual_pickup_time)
        .bind(order.actual_delivery_time)
        .bind(&order.carrier_id)
        .bind(&order.carrier_name)
        .bind(order.customer_price)
        .bind(order.carrier_cost)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(order))
    }
}

/// An open PostgreSQL transaction on the `orders` table.
///
/// sqlx rolls the transaction back when it is dropped uncommitted.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderTransaction for PostgresTransaction {
    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderRecord> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (customer_id, customer_name, pickup_location, dropoff_location, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(&order.customer_id)
        .bind(&order.customer_name)
        .bind(&order.pickup_location)
        .bind(&order.dropoff_location)
        .bind(INITIAL_STATUS)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_order(row)
    }

    async fn link_deal(&mut self, id: OrderId, deal_id: &DealId) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET deal_id = $2 WHERE id = $1")
            .bind(id.as_i64())
            .bind(deal_id.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_deal_conflict(e, deal_id))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
