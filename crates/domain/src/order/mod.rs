//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod number;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use commands::PlaceOrder;
pub use events::{OrderEvent, OrderPlacedData, OrderStatusChangedData, PaymentStatusChangedData};
pub use number::{MAX_SEQUENCE, ORDER_NUMBER_PREFIX, OrderNumber};
pub use state::{OrderStatus, PaymentMethod, PaymentStatus, TransitionCause};
pub use value_objects::{Money, OrderItem, PaymentInfo, ShippingAddress};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Input is missing or malformed.
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// A status value outside the accepted set.
    #[error("Invalid status: {value}")]
    InvalidStatus { value: String },

    /// The requested status change is not allowed from the current status.
    #[error("Invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
        reason: String,
    },

    /// Processing requires a completed payment.
    #[error("Payment is {status}, it must be completed before processing")]
    PaymentNotCompleted { status: PaymentStatus },

    /// The order was already placed.
    #[error("Order already placed")]
    AlreadyPlaced,

    /// A transition was requested on an order that was never placed.
    #[error("Order has not been placed")]
    NotPlaced,
}

impl OrderError {
    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        OrderError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
