use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::OrderItem;
use serde::{Deserialize, Serialize};

use crate::{ProductId, Result};

/// Quantity of one product taken from or returned to stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl StockLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }

    /// Builds the stock lines an order's items reserve.
    pub fn from_items(items: &[OrderItem]) -> Vec<StockLine> {
        items
            .iter()
            .map(|item| StockLine::new(item.product_id.clone(), item.quantity))
            .collect()
    }

    /// Sums quantities per product, ordered by product id.
    ///
    /// Batch operations walk products in this order so concurrent batches
    /// always lock rows in the same sequence.
    pub fn consolidate(lines: &[StockLine]) -> BTreeMap<ProductId, u32> {
        let mut totals = BTreeMap::new();
        for line in lines {
            let total: &mut u32 = totals.entry(line.product_id.clone()).or_default();
            *total = total.saturating_add(line.quantity);
        }
        totals
    }
}

/// Authoritative sellable quantity per product.
///
/// Every decrement is conditional on the current stock, so two checkouts
/// racing for the last unit can never both succeed and stock never goes
/// negative.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Fails with `InsufficientStock` or `ProductNotFound` if `quantity`
    /// cannot be taken right now. Does not reserve anything.
    async fn check_stock(&self, product_id: &ProductId, quantity: u32) -> Result<()>;

    /// Returns the current stock of a product.
    async fn stock_level(&self, product_id: &ProductId) -> Result<u32>;

    /// Takes `quantity` from one product if enough is available and returns
    /// the remaining stock.
    async fn decrement(&self, product_id: &ProductId, quantity: u32) -> Result<u32>;

    /// Takes every line from stock, or nothing at all.
    ///
    /// On failure the error names the first product, in product-id order,
    /// that could not be covered.
    async fn reserve(&self, lines: &[StockLine]) -> Result<()>;

    /// Puts previously reserved quantities back. Unknown products are skipped.
    async fn restore(&self, lines: &[StockLine]) -> Result<()>;

    /// Sets the stock of a product, creating it if needed.
    async fn set_stock(&self, product_id: &ProductId, stock: u32) -> Result<()>;

    /// Returns the number of products the ledger tracks.
    async fn product_count(&self) -> Result<u64>;
}

#[async_trait]
impl<T: InventoryLedger + ?Sized> InventoryLedger for Arc<T> {
    async fn check_stock(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        (**self).check_stock(product_id, quantity).await
    }

    async fn stock_level(&self, product_id: &ProductId) -> Result<u32> {
        (**self).stock_level(product_id).await
    }

    async fn decrement(&self, product_id: &ProductId, quantity: u32) -> Result<u32> {
        (**self).decrement(product_id, quantity).await
    }

    async fn reserve(&self, lines: &[StockLine]) -> Result<()> {
        (**self).reserve(lines).await
    }

    async fn restore(&self, lines: &[StockLine]) -> Result<()> {
        (**self).restore(lines).await
    }

    async fn set_stock(&self, product_id: &ProductId, stock: u32) -> Result<()> {
        (**self).set_stock(product_id, stock).await
    }

    async fn product_count(&self) -> Result<u64> {
        (**self).product_count().await
    }
}
