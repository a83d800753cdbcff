//! Reporting error types.

use chrono::NaiveDate;
use order_store::StoreError;
use thiserror::Error;

/// Errors that can occur while computing reports.
#[derive(Debug, Error)]
pub enum ReportingError {
    /// An error occurred in the order store or inventory ledger.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The requested reporting period is not recognised.
    #[error("Invalid period '{0}': expected 7d, 30d or 3m")]
    InvalidPeriod(String),

    /// The date range is empty or cannot be represented.
    #[error("Invalid date range: {start} to {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// The user directory could not be queried.
    #[error("User directory error: {0}")]
    Directory(String),
}

/// Result type for reporting operations.
pub type Result<T> = std::result::Result<T, ReportingError>;
