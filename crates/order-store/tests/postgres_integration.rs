//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and need a container runtime,
//! so they are ignored by default. Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use domain::{
    Aggregate, Money, Order, OrderItem, OrderNumber, OrderStatus, PaymentMethod, PlaceOrder,
    ShippingAddress,
};
use order_store::{
    InventoryLedger, OrderQuery, OrderStore, OrderStoreExt, PostgresInventoryLedger,
    PostgresOrderStore, ProductId, StockLine, StoreError, Version,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_orders_and_products.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Fresh pool with cleared tables
async fn get_test_pool() -> PgPool {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE orders, products")
        .execute(&pool)
        .await
        .unwrap();

    pool
}

fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Test Customer".to_string(),
        email: Some("customer@example.com".to_string()),
        phone: "555-0100".to_string(),
        street: "1 Main St".to_string(),
        city: "Springfield".to_string(),
        state: None,
        postal_code: "12345".to_string(),
        country: "US".to_string(),
    }
}

fn placed_order(number: &str, reference: &str, at: DateTime<Utc>) -> Order {
    let cmd = PlaceOrder::new(
        vec![OrderItem::new("SKU-A", "Widget", 2, Money::from_cents(100))],
        address(),
        reference,
        Money::from_cents(200),
        Money::from_cents(10),
        Money::from_cents(210),
    )
    .for_customer("user-1");
    let mut order = Order::default();
    let events = order.place(&cmd, OrderNumber::new(number), at).unwrap();
    order.apply_events(events);
    order.set_version(Version::first());
    order
}

#[tokio::test]
#[ignore = "requires a container runtime"]
#[serial]
async fn insert_and_get_roundtrip() {
    let store = PostgresOrderStore::new(get_test_pool().await);
    let order = placed_order("ORD-000001", "cod_1", Utc::now());

    store.insert(&order).await.unwrap();

    let loaded = store.get_required(order.id().unwrap()).await.unwrap();
    assert_eq!(loaded, order);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires a container runtime"]
#[serial]
async fn duplicate_order_number_is_reported() {
    let store = PostgresOrderStore::new(get_test_pool().await);
    store
        .insert(&placed_order("ORD-000001", "cod_1", Utc::now()))
        .await
        .unwrap();

    let result = store
        .insert(&placed_order("ORD-000001", "cod_2", Utc::now()))
        .await;
    assert!(matches!(result, Err(StoreError::DuplicateOrderNumber(_))));
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires a container runtime"]
#[serial]
async fn update_uses_optimistic_concurrency() {
    let store = PostgresOrderStore::new(get_test_pool().await);
    let order = placed_order("ORD-000001", "pi_1", Utc::now());
    store.insert(&order).await.unwrap();

    let mut shipped = order.clone();
    shipped.apply_events(
        shipped
            .update_order_status(OrderStatus::Shipped, Utc::now())
            .unwrap(),
    );
    shipped.set_version(Version::new(2));
    store.update(&shipped, Version::first()).await.unwrap();

    let stale = store.update(&shipped, Version::first()).await;
    assert!(matches!(
        stale,
        Err(StoreError::ConcurrencyConflict { actual, .. }) if actual == Version::new(2)
    ));

    let loaded = store.get_required(order.id().unwrap()).await.unwrap();
    assert_eq!(loaded.order_status(), OrderStatus::Shipped);
    assert_eq!(loaded.version(), Version::new(2));
}

#[tokio::test]
#[ignore = "requires a container runtime"]
#[serial]
async fn latest_sequential_number_skips_fallbacks() {
    let store = PostgresOrderStore::new(get_test_pool().await);
    for number in ["ORD-000002", "ORD-000010", "ORD-1718020800000-AB12CD"] {
        store
            .insert(&placed_order(number, "cod_1", Utc::now()))
            .await
            .unwrap();
    }

    assert_eq!(
        store.latest_sequential_number().await.unwrap(),
        Some(OrderNumber::new("ORD-000010"))
    );
}

#[tokio::test]
#[ignore = "requires a container runtime"]
#[serial]
async fn query_filters_newest_first() {
    let store = PostgresOrderStore::new(get_test_pool().await);
    let base = Utc::now() - Duration::days(2);
    store
        .insert(&placed_order("ORD-000001", "cod_1", base))
        .await
        .unwrap();
    store
        .insert(&placed_order("ORD-000002", "pi_1", base + Duration::days(1)))
        .await
        .unwrap();

    let all = store.query(OrderQuery::new()).await.unwrap();
    assert_eq!(all[0].order_number().as_str(), "ORD-000002");
    assert_eq!(all[1].order_number().as_str(), "ORD-000001");

    let card = store
        .query(OrderQuery::new().payment_method(PaymentMethod::Card))
        .await
        .unwrap();
    assert_eq!(card.len(), 1);

    let completed = store.query(OrderQuery::completed_payments()).await.unwrap();
    assert_eq!(completed.len(), 1);

    let mine = store
        .query(OrderQuery::new().customer("user-1").limit(1).offset(1))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].order_number().as_str(), "ORD-000001");
}

#[tokio::test]
#[ignore = "requires a container runtime"]
#[serial]
async fn ledger_reserve_is_all_or_nothing() {
    let ledger = PostgresInventoryLedger::new(get_test_pool().await);
    let a = ProductId::new("SKU-A");
    let b = ProductId::new("SKU-B");
    ledger.set_stock(&a, 5).await.unwrap();
    ledger.set_stock(&b, 1).await.unwrap();

    let result = ledger
        .reserve(&[StockLine::new("SKU-A", 2), StockLine::new("SKU-B", 2)])
        .await;
    assert!(matches!(
        result,
        Err(StoreError::InsufficientStock { requested: 2, available: 1, .. })
    ));
    assert_eq!(ledger.stock_level(&a).await.unwrap(), 5);
    assert_eq!(ledger.stock_level(&b).await.unwrap(), 1);

    ledger
        .reserve(&[StockLine::new("SKU-A", 2), StockLine::new("SKU-B", 1)])
        .await
        .unwrap();
    assert_eq!(ledger.stock_level(&a).await.unwrap(), 3);
    assert_eq!(ledger.stock_level(&b).await.unwrap(), 0);

    let missing = ledger.reserve(&[StockLine::new("SKU-X", 1)]).await;
    assert!(matches!(missing, Err(StoreError::ProductNotFound(_))));
}

#[tokio::test]
#[ignore = "requires a container runtime"]
#[serial]
async fn ledger_restore_and_count() {
    let ledger = PostgresInventoryLedger::new(get_test_pool().await);
    let a = ProductId::new("SKU-A");
    ledger.set_stock(&a, 1).await.unwrap();

    assert_eq!(ledger.decrement(&a, 1).await.unwrap(), 0);
    ledger
        .restore(&[StockLine::new("SKU-A", 3), StockLine::new("SKU-GONE", 1)])
        .await
        .unwrap();

    assert_eq!(ledger.stock_level(&a).await.unwrap(), 3);
    assert_eq!(ledger.product_count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires a container runtime"]
#[serial]
async fn concurrent_decrements_never_go_negative() {
    let ledger = PostgresInventoryLedger::new(get_test_pool().await);
    let a = ProductId::new("SKU-A");
    ledger.set_stock(&a, 20).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let ledger = ledger.clone();
        let a = a.clone();
        handles.push(tokio::spawn(async move { ledger.decrement(&a, 1).await }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 20);
    assert_eq!(ledger.stock_level(&a).await.unwrap(), 0);
}
