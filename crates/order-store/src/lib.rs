//! Persistence for orders and stock.
//!
//! `OrderStore` keeps order documents with optimistic concurrency on their
//! revision and a unique order number. `InventoryLedger` tracks stock per
//! product and reserves whole orders atomically. Both come with an in-memory
//! backend and a PostgreSQL backend.

pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;
pub mod timeout;

pub use common::{OrderId, ProductId, Version};
pub use error::{Result, StoreError};
pub use ledger::{InventoryLedger, StockLine};
pub use memory::{InMemoryInventoryLedger, InMemoryOrderStore};
pub use postgres::{PostgresInventoryLedger, PostgresOrderStore};
pub use query::OrderQuery;
pub use store::{OrderStore, OrderStoreExt};
pub use timeout::with_timeout;
