use std::time::Duration;

use domain::OrderNumber;
use thiserror::Error;

use crate::{OrderId, ProductId, Version};

/// Errors that can occur when interacting with the order store or the ledger.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No order exists with this identifier.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The ledger has no record of this product.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A conditional decrement found less stock than requested.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Another order already holds this order number.
    #[error("Order number already taken: {0}")]
    DuplicateOrderNumber(OrderNumber),

    /// An order with this identifier was already stored.
    #[error("Order already exists: {0}")]
    DuplicateOrderId(OrderId),

    /// Only placed orders carry an identifier and can be stored.
    #[error("Order has not been placed and has no identifier")]
    UnplacedOrder,

    /// The stored document revision did not match the expected one.
    #[error(
        "Concurrency conflict for order {order_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// The backing store did not answer in time.
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
