//! Day-granularity validity windows
//!
//! Promotional vouchers and bank-slip due dates operate at day granularity:
//! a voucher valid "until July 15" is accepted for the whole of July 15.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid window: start {start} must not be after end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },
}

/// A validity window, inclusive on both ends at day granularity
///
/// Used for voucher redemption periods. A window from `2026-05-01` to
/// `2026-07-15` contains both endpoint days entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    /// First day of the window (inclusive)
    pub start: NaiveDate,
    /// Last day of the window (inclusive)
    pub end: NaiveDate,
}

impl ValidityWindow {
    /// Creates a new validity window
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Returns true if the window contains the given day
    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }

    /// Returns true if the given day falls after the window
    pub fn is_past(&self, day: NaiveDate) -> bool {
        day > self.end
    }

    /// Returns true if the given day falls before the window
    pub fn is_upcoming(&self, day: NaiveDate) -> bool {
        day < self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_is_inclusive_on_both_ends() {
        let window = ValidityWindow::new(day(2026, 5, 1), day(2026, 7, 15)).unwrap();

        assert!(window.contains(day(2026, 5, 1)));
        assert!(window.contains(day(2026, 7, 15)));
        assert!(window.contains(day(2026, 6, 10)));
        assert!(!window.contains(day(2026, 4, 30)));
        assert!(!window.contains(day(2026, 7, 16)));
    }

    #[test]
    fn test_single_day_window() {
        let window = ValidityWindow::new(day(2026, 5, 1), day(2026, 5, 1)).unwrap();
        assert!(window.contains(day(2026, 5, 1)));
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let result = ValidityWindow::new(day(2026, 7, 15), day(2026, 5, 1));
        assert!(matches!(result, Err(TemporalError::InvalidWindow { .. })));
    }

    #[test]
    fn test_past_and_upcoming() {
        let window = ValidityWindow::new(day(2026, 5, 1), day(2026, 7, 15)).unwrap();
        assert!(window.is_past(day(2026, 8, 1)));
        assert!(window.is_upcoming(day(2026, 4, 1)));
        assert!(!window.is_past(day(2026, 7, 15)));
    }
}
