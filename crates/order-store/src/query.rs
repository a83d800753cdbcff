use chrono::{DateTime, Utc};
use domain::{Order, OrderStatus, PaymentMethod, PaymentStatus};

/// Builder for constructing order queries.
///
/// Every filter is optional; unset filters match all orders. Results are
/// returned newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Filter by payment method.
    pub payment_method: Option<PaymentMethod>,

    /// Filter by payment status.
    pub payment_status: Option<PaymentStatus>,

    /// Filter by order status.
    pub order_status: Option<OrderStatus>,

    /// Filter by the customer who placed the order.
    pub customer_id: Option<String>,

    /// Filter by orders created at or after this timestamp.
    pub created_from: Option<DateTime<Utc>>,

    /// Filter by orders created strictly before this timestamp.
    pub created_until: Option<DateTime<Utc>>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl OrderQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for orders whose payment completed.
    pub fn completed_payments() -> Self {
        Self::new().payment_status(PaymentStatus::Completed)
    }

    /// Creates a query for the `limit` most recent orders.
    pub fn recent(limit: usize) -> Self {
        Self::new().limit(limit)
    }

    pub fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn order_status(mut self, status: OrderStatus) -> Self {
        self.order_status = Some(status);
        self
    }

    pub fn customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    /// Restricts to orders created in `[from, until)`.
    pub fn created_between(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.created_from = Some(from);
        self.created_until = Some(until);
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first N results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the order passes every filter. Paging is not applied.
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(method) = self.payment_method
            && order.payment_info().payment_method != method
        {
            return false;
        }
        if let Some(status) = self.payment_status
            && order.payment_status() != status
        {
            return false;
        }
        if let Some(status) = self.order_status
            && order.order_status() != status
        {
            return false;
        }
        if let Some(customer_id) = &self.customer_id
            && order.customer_id() != Some(customer_id.as_str())
        {
            return false;
        }
        let created_at = order.created_at();
        if let Some(from) = self.created_from
            && created_at.is_none_or(|at| at < from)
        {
            return false;
        }
        if let Some(until) = self.created_until
            && created_at.is_none_or(|at| at >= until)
        {
            return false;
        }
        true
    }
}
