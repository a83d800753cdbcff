use async_trait::async_trait;
use chrono::Utc;
use domain::{Aggregate, Order, OrderNumber};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    OrderId, OrderQuery, ProductId, Result, StoreError, Version,
    ledger::{InventoryLedger, StockLine},
    store::{OrderStore, placed_id},
};

const ORDER_NUMBER_CONSTRAINT: &str = "unique_order_number";
const ORDER_ID_CONSTRAINT: &str = "orders_pkey";

/// Runs the database migrations shared by the order store and the ledger.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Connection pool options used by both PostgreSQL stores.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// PostgreSQL-backed order store.
///
/// Each order is one row: the full document as JSONB plus the columns the
/// listing and reporting queries filter on.
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
        run_migrations(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let document: serde_json::Value = row.try_get("document")?;
        let mut order: Order = serde_json::from_value(document)?;
        order.set_version(Version::new(row.try_get("version")?));
        Ok(order)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order), fields(order_number = %order.order_number()))]
    async fn insert(&self, order: &Order) -> Result<()> {
        let id = placed_id(order)?;
        let document = serde_json::to_value(order)?;
        let created_at = order.created_at().unwrap_or_else(Utc::now);

        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, version, customer_id, payment_method,
                                payment_status, order_status, total_cents, created_at,
                                updated_at, document)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(id.as_uuid())
        .bind(order.order_number().as_str())
        .bind(order.version().as_i64())
        .bind(order.customer_id())
        .bind(order.payment_info().payment_method.as_str())
        .bind(order.payment_status().as_str())
        .bind(order.order_status().as_str())
        .bind(order.total().cents())
        .bind(created_at)
        .bind(order.updated_at().unwrap_or(created_at))
        .bind(document)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                match db_err.constraint() {
                    Some(ORDER_NUMBER_CONSTRAINT) => {
                        return StoreError::DuplicateOrderNumber(order.order_number().clone());
                    }
                    Some(ORDER_ID_CONSTRAINT) => return StoreError::DuplicateOrderId(id),
                    _ => {}
                }
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    #[tracing::instrument(skip(self, order))]
    async fn update(&self, order: &Order, expected_version: Version) -> Result<()> {
        let id = placed_id(order)?;
        let document = serde_json::to_value(order)?;

        // order_number is written once by insert and never updated
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET version = $3, payment_status = $4, order_status = $5,
                updated_at = $6, document = $7
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected_version.as_i64())
        .bind(order.version().as_i64())
        .bind(order.payment_status().as_str())
        .bind(order.order_status().as_str())
        .bind(order.updated_at().unwrap_or_else(Utc::now))
        .bind(document)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match actual {
            Some(actual) => Err(StoreError::ConcurrencyConflict {
                order_id: id,
                expected: expected_version,
                actual: Version::new(actual),
            }),
            None => Err(StoreError::OrderNotFound(id)),
        }
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> =
            sqlx::query("SELECT version, document FROM orders WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn latest_sequential_number(&self) -> Result<Option<OrderNumber>> {
        let number: Option<String> = sqlx::query_scalar(
            r#"
            SELECT order_number FROM orders
            WHERE order_number ~ '^ORD-[0-9]{6}$'
            ORDER BY order_number DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(number.map(OrderNumber::new))
    }

    #[tracing::instrument(skip(self))]
    async fn query(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let mut sql = String::from("SELECT version, document FROM orders WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.payment_method.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND payment_method = ${param_count}"));
        }
        if query.payment_status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND payment_status = ${param_count}"));
        }
        if query.order_status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND order_status = ${param_count}"));
        }
        if query.customer_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND customer_id = ${param_count}"));
        }
        if query.created_from.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at >= ${param_count}"));
        }
        if query.created_until.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at < ${param_count}"));
        }

        sql.push_str(" ORDER BY created_at DESC, order_number DESC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(method) = query.payment_method {
            sqlx_query = sqlx_query.bind(method.as_str());
        }
        if let Some(status) = query.payment_status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(status) = query.order_status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(customer_id) = query.customer_id {
            sqlx_query = sqlx_query.bind(customer_id);
        }
        if let Some(from) = query.created_from {
            sqlx_query = sqlx_query.bind(from);
        }
        if let Some(until) = query.created_until {
            sqlx_query = sqlx_query.bind(until);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(i64::try_from(offset).unwrap_or(i64::MAX));
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

/// PostgreSQL-backed inventory ledger.
///
/// Decrements are single guarded `UPDATE ... WHERE stock >= $n` statements,
/// so the row lock taken by the update is the only synchronisation needed.
#[derive(Clone)]
pub struct PostgresInventoryLedger {
    pool: PgPool,
}

impl PostgresInventoryLedger {
    /// Creates a new PostgreSQL inventory ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn stock_from_db(stock: i64) -> u32 {
    u32::try_from(stock.max(0)).unwrap_or(u32::MAX)
}

async fn shortfall<'e, E>(executor: E, product_id: &ProductId, requested: u32) -> StoreError
where
    E: sqlx::PgExecutor<'e>,
{
    let available: std::result::Result<Option<i64>, sqlx::Error> =
        sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product_id.as_str())
            .fetch_optional(executor)
            .await;

    match available {
        Ok(Some(available)) => StoreError::InsufficientStock {
            product_id: product_id.clone(),
            requested,
            available: stock_from_db(available),
        },
        Ok(None) => StoreError::ProductNotFound(product_id.clone()),
        Err(e) => StoreError::Database(e),
    }
}

#[async_trait]
impl InventoryLedger for PostgresInventoryLedger {
    async fn check_stock(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        let available = self.stock_level(product_id).await?;
        if available < quantity {
            return Err(StoreError::InsufficientStock {
                product_id: product_id.clone(),
                requested: quantity,
                available,
            });
        }
        Ok(())
    }

    async fn stock_level(&self, product_id: &ProductId) -> Result<u32> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        stock
            .map(stock_from_db)
            .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))
    }

    #[tracing::instrument(skip(self))]
    async fn decrement(&self, product_id: &ProductId, quantity: u32) -> Result<u32> {
        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            RETURNING stock
            "#,
        )
        .bind(product_id.as_str())
        .bind(i64::from(quantity))
        .fetch_optional(&self.pool)
        .await?;

        match remaining {
            Some(remaining) => Ok(stock_from_db(remaining)),
            None => Err(shortfall(&self.pool, product_id, quantity).await),
        }
    }

    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    async fn reserve(&self, lines: &[StockLine]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for (product_id, quantity) in StockLine::consolidate(lines) {
            let result = sqlx::query(
                r#"
                UPDATE products SET stock = stock - $2, updated_at = NOW()
                WHERE id = $1 AND stock >= $2
                "#,
            )
            .bind(product_id.as_str())
            .bind(i64::from(quantity))
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let error = shortfall(&mut *tx, &product_id, quantity).await;
                tx.rollback().await?;
                return Err(error);
            }
        }

        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    async fn restore(&self, lines: &[StockLine]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for (product_id, quantity) in StockLine::consolidate(lines) {
            let result = sqlx::query(
                "UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(product_id.as_str())
            .bind(i64::from(quantity))
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tracing::warn!(%product_id, quantity, "skipping restore of unknown product");
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_stock(&self, product_id: &ProductId, stock: u32) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, stock, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (id) DO UPDATE SET
                stock = EXCLUDED.stock,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(product_id.as_str())
        .bind(i64::from(stock))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn product_count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
