//! Pre-built test data for common entities

use chrono::NaiveDate;
use core_kernel::{Currency, Money};
use rust_decimal_macros::dec;

/// Common money values
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// The canonical seat price used across the suite
    pub fn seat_price() -> Money {
        Money::new(dec!(120.00), Currency::BRL)
    }

    pub fn underpayment() -> Money {
        Money::new(dec!(80.00), Currency::BRL)
    }

    pub fn sponsor_price() -> Money {
        Money::new(dec!(5000.00), Currency::BRL)
    }

    pub fn minimum_donation() -> Money {
        Money::new(dec!(10.00), Currency::BRL)
    }
}

/// Common calendar values
pub struct TemporalFixtures;

impl TemporalFixtures {
    pub fn slip_due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 10).unwrap()
    }

    pub fn day_after_due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 11).unwrap()
    }
}
