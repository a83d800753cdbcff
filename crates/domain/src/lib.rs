//! Domain layer for the order back office.
//!
//! This crate holds the pure order model, free of any I/O:
//! - Aggregate trait for entities mutated through events
//! - Order aggregate with the payment-status / order-status state machine
//! - Order events, value objects and the placement command
//! - Order number format and payment reference classification

pub mod aggregate;
pub mod order;

pub use aggregate::{Aggregate, DomainEvent};
pub use common::{OrderId, ProductId, Version};
pub use order::{
    Money, Order, OrderError, OrderEvent, OrderItem, OrderNumber, OrderStatus, PaymentInfo,
    PaymentMethod, PaymentStatus, PlaceOrder, ShippingAddress, TransitionCause,
};
