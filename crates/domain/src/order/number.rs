//! Human-readable order numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix shared by every order number.
pub const ORDER_NUMBER_PREFIX: &str = "ORD-";

/// Largest sequence that fits the six-digit format.
pub const MAX_SEQUENCE: u32 = 999_999;

const SEQUENCE_WIDTH: usize = 6;

/// Human-readable order identifier, assigned once when the order is placed.
///
/// Regular numbers are `ORD-NNNNNN`. When the sequence cannot be derived or a
/// concurrent placement took the number first, a collision-resistant
/// `ORD-<millis>-<SUFFIX>` number is used instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Wraps an already assigned number, e.g. one read back from storage.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Builds the sequential number for `sequence`, or None if it overflows
    /// the six-digit format.
    pub fn sequential(sequence: u32) -> Option<Self> {
        if sequence == 0 || sequence > MAX_SEQUENCE {
            return None;
        }
        Some(Self(format!(
            "{ORDER_NUMBER_PREFIX}{sequence:0width$}",
            width = SEQUENCE_WIDTH
        )))
    }

    /// The number given to the very first order.
    pub fn first() -> Self {
        Self(format!("{ORDER_NUMBER_PREFIX}{:0width$}", 1, width = SEQUENCE_WIDTH))
    }

    /// Builds a fallback number from a timestamp and a random suffix.
    pub fn fallback(at: DateTime<Utc>, suffix: &str) -> Self {
        Self(format!(
            "{ORDER_NUMBER_PREFIX}{}-{}",
            at.timestamp_millis(),
            suffix.to_uppercase()
        ))
    }

    /// Returns the number following `previous` in the sequence.
    ///
    /// Returns None when `previous` is not a sequential number or the
    /// sequence is exhausted; callers then fall back.
    pub fn next_after(previous: Option<&OrderNumber>) -> Option<Self> {
        match previous {
            None => Some(Self::first()),
            Some(previous) => previous
                .sequence()
                .and_then(|seq| seq.checked_add(1))
                .and_then(Self::sequential),
        }
    }

    /// Parses the numeric suffix of a sequential number.
    pub fn sequence(&self) -> Option<u32> {
        let digits = self.0.strip_prefix(ORDER_NUMBER_PREFIX)?;
        if digits.len() != SEQUENCE_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Returns true if this is a regular `ORD-NNNNNN` number.
    pub fn is_sequential(&self) -> bool {
        self.sequence().is_some()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
