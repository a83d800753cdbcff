//! Order lifecycle engine.
//!
//! Placement turns a checkout into a persisted order:
//! 1. Validate the command
//! 2. Reserve stock for every line, all or nothing
//! 3. Assign an order number and insert the order, retrying with a
//!    fallback number when a concurrent placement took it first
//!
//! If the insert fails for any other reason the reservation is restored.
//! Transitions load the order, run the state machine and write the result
//! back under optimistic concurrency.

pub mod config;
pub mod engine;
pub mod error;
pub mod numbering;

pub use config::LifecycleConfig;
pub use engine::{CommandResult, OrderLifecycle};
pub use error::{LifecycleError, Result};
pub use numbering::OrderNumberAuthority;
