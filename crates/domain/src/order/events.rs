//! Order domain events.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{
    Money, OrderItem, OrderNumber, OrderStatus, PaymentInfo, PaymentStatus, ShippingAddress,
    TransitionCause,
};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Checkout was turned into an order.
    OrderPlaced(Box<OrderPlacedData>),

    /// Payment status was changed by an administrator or a payment callback.
    PaymentStatusChanged(PaymentStatusChangedData),

    /// Order status moved.
    OrderStatusChanged(OrderStatusChangedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::PaymentStatusChanged(_) => "PaymentStatusChanged",
            OrderEvent::OrderStatusChanged(_) => "OrderStatusChanged",
        }
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    /// Subject of the identity token that placed the order.
    pub customer_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_info: PaymentInfo,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub order_status: OrderStatus,
    pub placed_at: DateTime<Utc>,
}

/// Data for PaymentStatusChanged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusChangedData {
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    /// Present only when this change records the first completion.
    pub paid_at: Option<DateTime<Utc>>,
    pub changed_at: DateTime<Utc>,
}

/// Data for OrderStatusChanged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedData {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub cause: TransitionCause,
    pub changed_at: DateTime<Utc>,
}

impl OrderEvent {
    /// Creates a PaymentStatusChanged event.
    pub fn payment_status_changed(
        from: PaymentStatus,
        to: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
        changed_at: DateTime<Utc>,
    ) -> Self {
        OrderEvent::PaymentStatusChanged(PaymentStatusChangedData {
            from,
            to,
            paid_at,
            changed_at,
        })
    }

    /// Creates an OrderStatusChanged event.
    pub fn order_status_changed(
        from: OrderStatus,
        to: OrderStatus,
        cause: TransitionCause,
        changed_at: DateTime<Utc>,
    ) -> Self {
        OrderEvent::OrderStatusChanged(OrderStatusChangedData {
            from,
            to,
            cause,
            changed_at,
        })
    }
}
