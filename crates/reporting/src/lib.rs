//! Read-only reporting over stored orders.
//!
//! This crate derives dashboard statistics from the order store:
//! - [`ReportingAggregator`] for revenue totals, status counts and daily revenue series
//! - [`RevenuePeriod`] and [`DateRange`] for the calendar windows a series covers
//! - [`UserDirectory`] for the externally owned user count shown on the dashboard
//!
//! Nothing here mutates orders or stock.

pub mod aggregator;
pub mod directory;
pub mod error;
pub mod period;
pub mod summary;

pub use aggregator::ReportingAggregator;
pub use directory::{StaticUserDirectory, UserDirectory};
pub use error::{ReportingError, Result};
pub use period::{DateRange, RevenuePeriod};
pub use summary::{DailyRevenue, DashboardStats, RevenueSummary, StatusCounts};
