//! Order commands.

use common::OrderId;

use super::{Money, OrderError, OrderItem, PaymentMethod, ShippingAddress};

/// Command to turn a checkout into an order.
///
/// Amounts are computed by the storefront and only checked for consistency
/// here; they are never re-derived from the items.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// The order ID to create.
    pub order_id: OrderId,

    /// Subject of the identity token placing the order.
    pub customer_id: Option<String>,

    pub items: Vec<OrderItem>,

    pub shipping_address: ShippingAddress,

    /// Processor intent id, or a manual-payment token.
    pub payment_intent_id: String,

    /// Explicit method. When None it is inferred from `payment_intent_id`.
    pub payment_method: Option<PaymentMethod>,

    pub subtotal: Money,

    pub shipping_cost: Money,

    pub total: Money,
}

impl PlaceOrder {
    /// Creates a new PlaceOrder command with a generated order ID.
    pub fn new(
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        payment_intent_id: impl Into<String>,
        subtotal: Money,
        shipping_cost: Money,
        total: Money,
    ) -> Self {
        Self {
            order_id: OrderId::new(),
            customer_id: None,
            items,
            shipping_address,
            payment_intent_id: payment_intent_id.into(),
            payment_method: None,
            subtotal,
            shipping_cost,
            total,
        }
    }

    /// Attributes the order to a customer.
    pub fn for_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    /// Sets the payment method explicitly.
    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    /// Returns the effective payment method.
    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
            .unwrap_or_else(|| PaymentMethod::from_reference(&self.payment_intent_id))
    }

    /// Checks the command without touching inventory or storage.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.items.is_empty() {
            return Err(OrderError::validation("items", "at least one item is required"));
        }
        for (index, item) in self.items.iter().enumerate() {
            item.validate(index)?;
        }

        self.shipping_address.validate()?;

        if self.payment_intent_id.trim().is_empty() {
            return Err(OrderError::validation("paymentIntentId", "is required"));
        }

        for (field, amount) in [
            ("subtotal", self.subtotal),
            ("shippingCost", self.shipping_cost),
            ("total", self.total),
        ] {
            if amount.is_negative() {
                return Err(OrderError::validation(field, "must not be negative"));
            }
        }

        let Some(expected) = self.subtotal.checked_add(self.shipping_cost) else {
            return Err(OrderError::validation(
                "total",
                "subtotal plus shipping exceeds the largest representable amount",
            ));
        };
        if self.total != expected {
            return Err(OrderError::validation(
                "total",
                format!(
                    "{} does not equal subtotal {} plus shipping {}",
                    self.total, self.subtotal, self.shipping_cost
                ),
            ));
        }

        Ok(())
    }
}
