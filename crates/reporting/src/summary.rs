//! Report shapes returned by the aggregator.

use chrono::NaiveDate;
use domain::{Money, Order, OrderStatus};
use serde::Serialize;

/// Number of orders in each fulfilment status.
///
/// Every status is always present, with zero for statuses no order is in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub processing: u64,
    pub shipped: u64,
    pub delivered: u64,
    pub cancelled: u64,
}

impl StatusCounts {
    /// Counts the statuses of `orders`.
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut counts = Self::default();
        for order in orders {
            counts.increment(order.order_status());
        }
        counts
    }

    pub fn increment(&mut self, status: OrderStatus) {
        *self.slot(status) += 1;
    }

    pub fn get(&self, status: OrderStatus) -> u64 {
        match status {
            OrderStatus::Pending => self.pending,
            OrderStatus::Processing => self.processing,
            OrderStatus::Shipped => self.shipped,
            OrderStatus::Delivered => self.delivered,
            OrderStatus::Cancelled => self.cancelled,
        }
    }

    /// Total number of orders counted.
    pub fn total(&self) -> u64 {
        OrderStatus::ALL.iter().map(|status| self.get(*status)).sum()
    }

    fn slot(&mut self, status: OrderStatus) -> &mut u64 {
        match status {
            OrderStatus::Pending => &mut self.pending,
            OrderStatus::Processing => &mut self.processing,
            OrderStatus::Shipped => &mut self.shipped,
            OrderStatus::Delivered => &mut self.delivered,
            OrderStatus::Cancelled => &mut self.cancelled,
        }
    }
}

/// Revenue and count of orders whose payment completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSummary {
    pub total_revenue: Money,
    pub completed_orders: u64,
}

impl RevenueSummary {
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        orders
            .into_iter()
            .fold(Self::default(), |mut summary, order| {
                summary.total_revenue += order.total();
                summary.completed_orders += 1;
                summary
            })
    }
}

/// Revenue booked on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: Money,
    pub orders: u64,
}

impl DailyRevenue {
    /// A day with no completed orders.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            revenue: Money::zero(),
            orders: 0,
        }
    }
}

/// Everything the admin dashboard shows at a glance.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_orders: u64,
    pub total_revenue: Money,
    pub completed_orders: u64,
    pub status_counts: StatusCounts,
    pub total_products: u64,
    pub total_users: u64,
    pub recent_orders: Vec<Order>,
}
