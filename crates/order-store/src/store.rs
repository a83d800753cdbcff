use std::sync::Arc;

use async_trait::async_trait;
use domain::{Order, OrderNumber};

use crate::{OrderId, OrderQuery, Result, StoreError, Version};

/// Core trait for order record store implementations.
///
/// The store persists one document per order, keyed by its identifier and
/// guarded by a unique order number. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Stores a newly placed order.
    ///
    /// Fails with `DuplicateOrderNumber` if another order holds the same
    /// number and with `DuplicateOrderId` if the identifier is taken. Nothing
    /// is written in either case.
    async fn insert(&self, order: &Order) -> Result<()>;

    /// Replaces a stored order.
    ///
    /// The stored document must still be at `expected_version`, otherwise the
    /// call fails with `ConcurrencyConflict`. The new document carries its
    /// own (bumped) version.
    async fn update(&self, order: &Order, expected_version: Version) -> Result<()>;

    /// Retrieves an order by identifier.
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    /// Returns the highest regular `ORD-NNNNNN` number in the store.
    ///
    /// Fallback numbers are ignored, so a single fallback never stops the
    /// sequence from advancing.
    async fn latest_sequential_number(&self) -> Result<Option<OrderNumber>>;

    /// Retrieves orders matching a query, newest first.
    async fn query(&self, query: OrderQuery) -> Result<Vec<Order>>;

    /// Returns the number of stored orders.
    async fn count(&self) -> Result<u64>;
}

/// Extension trait providing convenience methods for order stores.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Retrieves an order, failing with `OrderNotFound` if it is absent.
    async fn get_required(&self, id: OrderId) -> Result<Order> {
        self.get(id).await?.ok_or(StoreError::OrderNotFound(id))
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn insert(&self, order: &Order) -> Result<()> {
        (**self).insert(order).await
    }

    async fn update(&self, order: &Order, expected_version: Version) -> Result<()> {
        (**self).update(order, expected_version).await
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        (**self).get(id).await
    }

    async fn latest_sequential_number(&self) -> Result<Option<OrderNumber>> {
        (**self).latest_sequential_number().await
    }

    async fn query(&self, query: OrderQuery) -> Result<Vec<Order>> {
        (**self).query(query).await
    }

    async fn count(&self) -> Result<u64> {
        (**self).count().await
    }
}

/// Returns the order's identifier, or `UnplacedOrder` for a blank aggregate.
pub(crate) fn placed_id(order: &Order) -> Result<OrderId> {
    use domain::Aggregate;
    order.id().ok_or(StoreError::UnplacedOrder)
}
