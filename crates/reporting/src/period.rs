//! Calendar windows for revenue reporting.

use std::str::FromStr;

use chrono::{DateTime, Days, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReportingError, Result};

/// Named reporting window ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RevenuePeriod {
    /// The last seven calendar days, today included.
    #[default]
    #[serde(rename = "7d")]
    SevenDays,

    /// The last thirty calendar days, today included.
    #[serde(rename = "30d")]
    ThirtyDays,

    /// From the same day three months ago through today.
    #[serde(rename = "3m")]
    ThreeMonths,
}

impl RevenuePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevenuePeriod::SevenDays => "7d",
            RevenuePeriod::ThirtyDays => "30d",
            RevenuePeriod::ThreeMonths => "3m",
        }
    }

    /// Returns the inclusive range of days this period covers when it ends
    /// on `today`.
    pub fn range_ending(&self, today: NaiveDate) -> Result<DateRange> {
        let start = match self {
            RevenuePeriod::SevenDays => today.checked_sub_days(Days::new(6)),
            RevenuePeriod::ThirtyDays => today.checked_sub_days(Days::new(29)),
            RevenuePeriod::ThreeMonths => today.checked_sub_months(Months::new(3)),
        };

        match start {
            Some(start) => DateRange::new(start, today),
            None => Err(ReportingError::InvalidRange {
                start: today,
                end: today,
            }),
        }
    }

    /// Returns the range this period covers ending on the current UTC day.
    pub fn current_range(&self) -> Result<DateRange> {
        self.range_ending(Utc::now().date_naive())
    }
}

impl std::fmt::Display for RevenuePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevenuePeriod {
    type Err = ReportingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "7d" => Ok(RevenuePeriod::SevenDays),
            "30d" => Ok(RevenuePeriod::ThirtyDays),
            "3m" => Ok(RevenuePeriod::ThreeMonths),
            other => Err(ReportingError::InvalidPeriod(other.to_string())),
        }
    }
}

/// Inclusive range of calendar days, interpreted in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range; `start` must not be after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end || end.checked_add_days(Days::new(1)).is_none() {
            return Err(ReportingError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days in the range, both ends included.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Iterates every day in the range in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    /// Returns the half-open timestamp bounds `[start 00:00, end + 1 00:00)`.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let after_end = self.end.checked_add_days(Days::new(1)).unwrap_or(self.end);
        (midnight(self.start), midnight(after_end))
    }
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}
