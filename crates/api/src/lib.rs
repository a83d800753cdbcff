//! HTTP API server for the order lifecycle engine.
//!
//! Provides REST endpoints for order placement, status management,
//! dashboard reporting and stock levels, with bearer-token identity,
//! structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, patch, post};
use lifecycle::OrderLifecycle;
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{
    InMemoryInventoryLedger, InMemoryOrderStore, InventoryLedger, OrderStore,
    PostgresInventoryLedger, PostgresOrderStore, StoreError,
};
use reporting::{ReportingAggregator, StaticUserDirectory, UserDirectory};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::JwtAuth;
use config::Config;

/// Order store shared by the engine and the reports.
pub type SharedOrderStore = Arc<dyn OrderStore>;

/// Inventory ledger shared by the engine and the inventory endpoints.
pub type SharedLedger = Arc<dyn InventoryLedger>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub lifecycle: OrderLifecycle<SharedOrderStore, SharedLedger>,
    pub reports: ReportingAggregator<SharedOrderStore>,
    pub users: Arc<dyn UserDirectory>,
    pub auth: JwtAuth,
}

impl AppState {
    /// Wires the engine and reports over the given backends.
    pub fn new(
        store: SharedOrderStore,
        ledger: SharedLedger,
        users: Arc<dyn UserDirectory>,
        config: &Config,
    ) -> Self {
        let lifecycle_config = config.lifecycle();
        let reports = ReportingAggregator::new(store.clone(), lifecycle_config.store_timeout);
        Self {
            lifecycle: OrderLifecycle::new(store, ledger, lifecycle_config),
            reports,
            users,
            auth: JwtAuth::new(&config.jwt_secret, config.jwt_issuer.clone()),
        }
    }

    /// State backed by in-memory stores.
    pub fn in_memory(config: &Config) -> Self {
        Self::new(
            Arc::new(InMemoryOrderStore::new()),
            Arc::new(InMemoryInventoryLedger::new()),
            Arc::new(StaticUserDirectory::new(config.user_count)),
            config,
        )
    }

    /// State backed by PostgreSQL. Runs pending migrations first.
    pub async fn postgres(config: &Config, database_url: &str) -> Result<Self, StoreError> {
        let pool = order_store::postgres::connect(database_url, config.database_max_connections)
            .await?;
        order_store::postgres::run_migrations(&pool).await?;

        Ok(Self::new(
            Arc::new(PostgresOrderStore::new(pool.clone())),
            Arc::new(PostgresInventoryLedger::new(pool)),
            Arc::new(StaticUserDirectory::new(config.user_count)),
            config,
        ))
    }

    /// Bound applied to store calls made directly by handlers.
    pub fn store_timeout(&self) -> Duration {
        self.lifecycle.config().store_timeout
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            post(routes::orders::create).get(routes::orders::list),
        )
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/status", patch(routes::orders::update_status))
        .route(
            "/orders/{id}/payment-status",
            patch(routes::orders::update_payment_status),
        )
        .route("/dashboard/stats", get(routes::dashboard::stats))
        .route("/analytics/revenue", get(routes::dashboard::revenue))
        .route(
            "/inventory/{product_id}",
            get(routes::inventory::get).put(routes::inventory::put),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
