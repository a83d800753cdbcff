//! Shared identifiers used across the order back office crates.

mod types;

pub use types::{OrderId, ProductId, Version};
