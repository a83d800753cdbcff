//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, Version};
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{
    Money, OrderError, OrderEvent, OrderItem, OrderNumber, OrderStatus, PaymentInfo,
    PaymentStatus, PlaceOrder, ShippingAddress, TransitionCause,
    events::{OrderPlacedData, OrderStatusChangedData, PaymentStatusChangedData},
};

/// Order aggregate root.
///
/// This is also the persisted document shape: one record per checkout,
/// holding the item and address snapshots, the payment sub-record, the
/// amounts and both status fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: Option<OrderId>,

    order_number: OrderNumber,

    /// Document revision for optimistic concurrency.
    #[serde(default)]
    version: Version,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    customer_id: Option<String>,

    items: Vec<OrderItem>,

    shipping_address: ShippingAddress,

    payment_info: PaymentInfo,

    subtotal: Money,

    shipping_cost: Money,

    total: Money,

    order_status: OrderStatus,

    created_at: Option<DateTime<Utc>>,

    updated_at: Option<DateTime<Utc>>,

    delivered_at: Option<DateTime<Utc>>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn id(&self) -> Option<OrderId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderPlaced(data) => self.apply_order_placed(*data),
            OrderEvent::PaymentStatusChanged(data) => self.apply_payment_status_changed(data),
            OrderEvent::OrderStatusChanged(data) => self.apply_order_status_changed(data),
        }
    }
}

// Query methods
impl Order {
    /// Returns the human-readable order number.
    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn payment_info(&self) -> &PaymentInfo {
        &self.payment_info
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_info.payment_status
    }

    pub fn order_status(&self) -> OrderStatus {
        self.order_status
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn shipping_cost(&self) -> Money {
        self.shipping_cost
    }

    pub fn total(&self) -> Money {
        self.total
    }

    /// Returns the placement time. Only None before the order is placed.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    /// Returns true if the order status is terminal.
    pub fn is_terminal(&self) -> bool {
        self.order_status.is_terminal()
    }
}

// Command methods (return events)
impl Order {
    /// Places a new order under the given number.
    ///
    /// Initial statuses follow the payment method: processor-backed payments
    /// start completed and processing, manual ones start pending.
    pub fn place(
        &self,
        cmd: &PlaceOrder,
        order_number: OrderNumber,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyPlaced);
        }

        cmd.validate()?;

        let method = cmd.payment_method();
        let payment_status = method.initial_payment_status();
        let paid_at = (payment_status == PaymentStatus::Completed).then_some(now);

        Ok(vec![OrderEvent::OrderPlaced(Box::new(OrderPlacedData {
            order_id: cmd.order_id,
            order_number,
            customer_id: cmd.customer_id.clone(),
            items: cmd.items.clone(),
            shipping_address: cmd.shipping_address.clone(),
            payment_info: PaymentInfo {
                payment_intent_id: cmd.payment_intent_id.clone(),
                payment_method: method,
                payment_status,
                paid_at,
            },
            subtotal: cmd.subtotal,
            shipping_cost: cmd.shipping_cost,
            total: cmd.total,
            order_status: method.initial_order_status(),
            placed_at: now,
        }))])
    }

    /// Sets the payment status.
    ///
    /// Only `completed` and `failed` may be set. Completing records `paid_at`
    /// the first time and moves a pending order to processing; repeating a
    /// completion produces no events.
    pub fn update_payment_status(
        &self,
        target: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;

        if !target.is_settable() {
            return Err(OrderError::InvalidStatus {
                value: target.to_string(),
            });
        }

        let current = self.payment_info.payment_status;
        let first_paid_at = (target == PaymentStatus::Completed
            && self.payment_info.paid_at.is_none())
        .then(|| paid_at.unwrap_or(now));

        let mut events = Vec::new();
        if target != current || first_paid_at.is_some() {
            events.push(OrderEvent::payment_status_changed(
                current,
                target,
                first_paid_at,
                now,
            ));
        }

        if target == PaymentStatus::Completed && self.order_status == OrderStatus::Pending {
            events.push(OrderEvent::order_status_changed(
                OrderStatus::Pending,
                OrderStatus::Processing,
                TransitionCause::PaymentCompleted,
                now,
            ));
        }

        Ok(events)
    }

    /// Moves the order to `target`.
    ///
    /// Terminal orders cannot move, the status never goes backwards, processing
    /// needs a completed payment and delivery needs a shipped order. Setting the
    /// current status again produces no events.
    pub fn update_order_status(
        &self,
        target: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;

        let current = self.order_status;

        if current.is_terminal() {
            return Err(OrderError::InvalidTransition {
                from: current,
                to: target,
                reason: format!("order is already {current}"),
            });
        }

        if target == current {
            return Ok(vec![]);
        }

        match target {
            OrderStatus::Processing
                if self.payment_info.payment_status != PaymentStatus::Completed =>
            {
                return Err(OrderError::PaymentNotCompleted {
                    status: self.payment_info.payment_status,
                });
            }
            OrderStatus::Delivered if current != OrderStatus::Shipped => {
                return Err(OrderError::InvalidTransition {
                    from: current,
                    to: target,
                    reason: "order must be shipped before delivered".to_string(),
                });
            }
            _ => {}
        }

        if let (Some(from), Some(to)) = (current.progression(), target.progression()) {
            if to < from {
                return Err(OrderError::InvalidTransition {
                    from: current,
                    to: target,
                    reason: "order status cannot move backwards".to_string(),
                });
            }
        }

        Ok(vec![OrderEvent::order_status_changed(
            current,
            target,
            TransitionCause::Requested,
            now,
        )])
    }

    fn ensure_placed(&self) -> Result<(), OrderError> {
        if self.id.is_none() {
            return Err(OrderError::NotPlaced);
        }
        Ok(())
    }
}

// Apply event helpers
impl Order {
    fn apply_order_placed(&mut self, data: OrderPlacedData) {
        self.id = Some(data.order_id);
        self.order_number = data.order_number;
        self.customer_id = data.customer_id;
        self.items = data.items;
        self.shipping_address = data.shipping_address;
        self.payment_info = data.payment_info;
        self.subtotal = data.subtotal;
        self.shipping_cost = data.shipping_cost;
        self.total = data.total;
        self.order_status = data.order_status;
        self.created_at = Some(data.placed_at);
        self.updated_at = Some(data.placed_at);
    }

    fn apply_payment_status_changed(&mut self, data: PaymentStatusChangedData) {
        self.payment_info.payment_status = data.to;
        if self.payment_info.paid_at.is_none() {
            self.payment_info.paid_at = data.paid_at;
        }
        self.updated_at = Some(data.changed_at);
    }

    fn apply_order_status_changed(&mut self, data: OrderStatusChangedData) {
        self.order_status = data.to;
        if data.to == OrderStatus::Delivered {
            self.delivered_at = Some(data.changed_at);
        }
        self.updated_at = Some(data.changed_at);
    }
}
