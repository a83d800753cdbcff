use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use domain::{Aggregate, Order, OrderNumber};
use tokio::sync::RwLock;

use crate::{
    OrderId, OrderQuery, ProductId, Result, StoreError, Version,
    ledger::{InventoryLedger, StockLine},
    store::{OrderStore, placed_id},
};

#[derive(Default)]
struct OrderTable {
    orders: HashMap<OrderId, Order>,
    numbers: HashSet<OrderNumber>,
}

/// In-memory order store implementation.
///
/// Used when no database is configured and in tests. Provides the same
/// uniqueness and optimistic-concurrency guarantees as the PostgreSQL store.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    table: Arc<RwLock<OrderTable>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let id = placed_id(order)?;
        let mut table = self.table.write().await;

        if table.numbers.contains(order.order_number()) {
            return Err(StoreError::DuplicateOrderNumber(order.order_number().clone()));
        }
        if table.orders.contains_key(&id) {
            return Err(StoreError::DuplicateOrderId(id));
        }

        table.numbers.insert(order.order_number().clone());
        table.orders.insert(id, order.clone());
        Ok(())
    }

    async fn update(&self, order: &Order, expected_version: Version) -> Result<()> {
        let id = placed_id(order)?;
        let mut table = self.table.write().await;

        let stored = table
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;

        if stored.version() != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                order_id: id,
                expected: expected_version,
                actual: stored.version(),
            });
        }

        *stored = order.clone();
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.table.read().await.orders.get(&id).cloned())
    }

    async fn latest_sequential_number(&self) -> Result<Option<OrderNumber>> {
        let table = self.table.read().await;
        Ok(table
            .numbers
            .iter()
            .filter(|number| number.is_sequential())
            .max()
            .cloned())
    }

    async fn query(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let table = self.table.read().await;
        let mut orders: Vec<_> = table
            .orders
            .values()
            .filter(|order| query.matches(order))
            .cloned()
            .collect();

        // Newest first, with the order number breaking ties deterministically
        orders.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.order_number().cmp(a.order_number()))
        });

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(orders.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.table.read().await.orders.len() as u64)
    }
}

/// In-memory inventory ledger.
///
/// All stock lives behind one lock, so a batch reservation checks and
/// decrements every line without another writer interleaving.
#[derive(Clone, Default)]
pub struct InMemoryInventoryLedger {
    stock: Arc<RwLock<HashMap<ProductId, u32>>>,
}

impl InMemoryInventoryLedger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger seeded with the given stock levels.
    pub fn with_stock<I, P>(levels: I) -> Self
    where
        I: IntoIterator<Item = (P, u32)>,
        P: Into<ProductId>,
    {
        let stock = levels
            .into_iter()
            .map(|(product_id, quantity)| (product_id.into(), quantity))
            .collect();
        Self {
            stock: Arc::new(RwLock::new(stock)),
        }
    }
}

fn take(
    stock: &HashMap<ProductId, u32>,
    product_id: &ProductId,
    quantity: u32,
) -> Result<u32> {
    let available = *stock
        .get(product_id)
        .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))?;
    available
        .checked_sub(quantity)
        .ok_or_else(|| StoreError::InsufficientStock {
            product_id: product_id.clone(),
            requested: quantity,
            available,
        })
}

#[async_trait]
impl InventoryLedger for InMemoryInventoryLedger {
    async fn check_stock(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        take(&*self.stock.read().await, product_id, quantity).map(|_| ())
    }

    async fn stock_level(&self, product_id: &ProductId) -> Result<u32> {
        self.stock
            .read()
            .await
            .get(product_id)
            .copied()
            .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))
    }

    async fn decrement(&self, product_id: &ProductId, quantity: u32) -> Result<u32> {
        let mut stock = self.stock.write().await;
        let remaining = take(&stock, product_id, quantity)?;
        stock.insert(product_id.clone(), remaining);
        Ok(remaining)
    }

    async fn reserve(&self, lines: &[StockLine]) -> Result<()> {
        let totals = StockLine::consolidate(lines);
        let mut stock = self.stock.write().await;

        let mut remaining = Vec::with_capacity(totals.len());
        for (product_id, quantity) in totals {
            let left = take(&stock, &product_id, quantity)?;
            remaining.push((product_id, left));
        }

        stock.extend(remaining);
        Ok(())
    }

    async fn restore(&self, lines: &[StockLine]) -> Result<()> {
        let mut stock = self.stock.write().await;
        for (product_id, quantity) in StockLine::consolidate(lines) {
            match stock.get_mut(&product_id) {
                Some(level) => *level = level.saturating_add(quantity),
                None => {
                    tracing::warn!(%product_id, quantity, "skipping restore of unknown product");
                }
            }
        }
        Ok(())
    }

    async fn set_stock(&self, product_id: &ProductId, level: u32) -> Result<()> {
        self.stock.write().await.insert(product_id.clone(), level);
        Ok(())
    }

    async fn product_count(&self) -> Result<u64> {
        Ok(self.stock.read().await.len() as u64)
    }
}
