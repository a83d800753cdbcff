//! Lifecycle error types.

use std::time::Duration;

use common::{OrderId, ProductId};
use domain::OrderError;
use order_store::StoreError;
use thiserror::Error;

/// Errors that can occur during order placement and transitions.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The request was rejected by validation or the state machine.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// A line asked for more than the ledger holds.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A line references a product the ledger does not know.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Order not found.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// A store call exceeded its time budget.
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// The backing store failed or could not assign an order number.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Concurrent writers kept changing the order.
    #[error("Order {order_id} was modified concurrently {attempts} times, giving up")]
    Conflict { order_id: OrderId, attempts: u32 },
}

impl LifecycleError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            LifecycleError::Order(OrderError::Validation { .. }) => "validation",
            LifecycleError::Order(OrderError::InvalidStatus { .. }) => "invalid_status",
            LifecycleError::Order(OrderError::InvalidTransition { .. }) => "invalid_transition",
            LifecycleError::Order(OrderError::PaymentNotCompleted { .. }) => {
                "payment_not_completed"
            }
            LifecycleError::Order(_) => "order",
            LifecycleError::InsufficientStock { .. } => "insufficient_stock",
            LifecycleError::ProductNotFound(_) => "product_not_found",
            LifecycleError::NotFound(_) => "not_found",
            LifecycleError::Timeout(_) => "timeout",
            LifecycleError::StoreUnavailable(_) => "store_unavailable",
            LifecycleError::Conflict { .. } => "conflict",
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderNotFound(id) => LifecycleError::NotFound(id),
            StoreError::ProductNotFound(product_id) => LifecycleError::ProductNotFound(product_id),
            StoreError::InsufficientStock {
                product_id,
                requested,
                available,
            } => LifecycleError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            StoreError::Timeout(duration) => LifecycleError::Timeout(duration),
            StoreError::ConcurrencyConflict { order_id, .. } => LifecycleError::Conflict {
                order_id,
                attempts: 1,
            },
            other => LifecycleError::StoreUnavailable(other.to_string()),
        }
    }
}

/// Convenience type alias for lifecycle results.
pub type Result<T> = std::result::Result<T, LifecycleError>;
