//! Reporting aggregator over the order store.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use domain::Order;
use order_store::{InventoryLedger, OrderQuery, OrderStore, with_timeout};

use crate::directory::UserDirectory;
use crate::error::{ReportingError, Result};
use crate::period::{DateRange, RevenuePeriod};
use crate::summary::{DailyRevenue, DashboardStats, RevenueSummary, StatusCounts};

/// Number of orders listed under "recent orders" on the dashboard.
pub const RECENT_ORDERS: usize = 5;

/// Derives dashboard statistics from stored orders.
///
/// The aggregator only reads. Every store call is bounded by the configured
/// timeout, and an empty store yields zeroed reports rather than errors.
#[derive(Clone)]
pub struct ReportingAggregator<S> {
    store: S,
    timeout: Duration,
}

impl<S: OrderStore> ReportingAggregator<S> {
    /// Creates a new aggregator reading from `store`.
    pub fn new(store: S, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Returns a reference to the underlying order store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Sums the totals of, and counts, orders whose payment completed.
    #[tracing::instrument(skip(self))]
    pub async fn total_revenue_and_count(&self) -> Result<RevenueSummary> {
        let orders = self.fetch(OrderQuery::completed_payments()).await?;
        Ok(RevenueSummary::from_orders(&orders))
    }

    /// Counts orders per fulfilment status.
    #[tracing::instrument(skip(self))]
    pub async fn order_status_counts(&self) -> Result<StatusCounts> {
        let orders = self.fetch(OrderQuery::new()).await?;
        Ok(StatusCounts::from_orders(&orders))
    }

    /// Buckets completed-payment revenue by creation day over
    /// `[start, end]`.
    ///
    /// Every day in the range is present, ascending, with zero for days
    /// without completed orders.
    pub async fn daily_revenue_series(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRevenue>> {
        self.revenue_series(DateRange::new(start, end)?).await
    }

    /// Daily revenue for a named period ending today (UTC).
    pub async fn revenue_for_period(&self, period: RevenuePeriod) -> Result<Vec<DailyRevenue>> {
        self.revenue_series(period.current_range()?).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn revenue_series(&self, range: DateRange) -> Result<Vec<DailyRevenue>> {
        let (from, until) = range.bounds();
        let orders = self
            .fetch(OrderQuery::completed_payments().created_between(from, until))
            .await?;

        let mut buckets: BTreeMap<NaiveDate, DailyRevenue> = range
            .days()
            .map(|day| (day, DailyRevenue::empty(day)))
            .collect();

        for order in &orders {
            if let Some(created_at) = order.created_at()
                && let Some(bucket) = buckets.get_mut(&created_at.date_naive())
            {
                bucket.revenue += order.total();
                bucket.orders += 1;
            }
        }

        tracing::debug!(
            days = buckets.len(),
            orders = orders.len(),
            "revenue series computed"
        );

        Ok(buckets.into_values().collect())
    }

    /// Returns the `limit` most recently created orders.
    pub async fn recent_orders(&self, limit: usize) -> Result<Vec<Order>> {
        self.fetch(OrderQuery::recent(limit)).await
    }

    /// Returns the number of stored orders.
    pub async fn total_orders(&self) -> Result<u64> {
        Ok(with_timeout(self.timeout, self.store.count()).await?)
    }

    /// Assembles the admin dashboard.
    ///
    /// Product and user counts come from collaborators outside the order
    /// store; all reads run concurrently.
    #[tracing::instrument(skip(self, ledger, users))]
    pub async fn dashboard_stats<L, U>(&self, ledger: &L, users: &U) -> Result<DashboardStats>
    where
        L: InventoryLedger + ?Sized,
        U: UserDirectory + ?Sized,
    {
        let product_count = async {
            with_timeout(self.timeout, ledger.product_count())
                .await
                .map_err(ReportingError::from)
        };

        let (total_orders, revenue, status_counts, total_products, total_users, recent_orders) =
            futures_util::try_join!(
                self.total_orders(),
                self.total_revenue_and_count(),
                self.order_status_counts(),
                product_count,
                users.user_count(),
                self.recent_orders(RECENT_ORDERS),
            )?;

        metrics::counter!("dashboard_reports_total").increment(1);

        Ok(DashboardStats {
            total_orders,
            total_revenue: revenue.total_revenue,
            completed_orders: revenue.completed_orders,
            status_counts,
            total_products,
            total_users,
            recent_orders,
        })
    }

    async fn fetch(&self, query: OrderQuery) -> Result<Vec<Order>> {
        Ok(with_timeout(self.timeout, self.store.query(query)).await?)
    }
}
