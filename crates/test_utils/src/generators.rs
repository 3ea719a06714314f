//! Property-based test data generators

use core_kernel::{Currency, Money};
use domain_purchase::PaymentStatus;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Positive two-decimal-place BRL amounts
pub fn money_amount() -> impl Strategy<Value = Money> {
    (1i64..=1_000_000).prop_map(|minor| Money::from_minor(minor, Currency::BRL))
}

/// Any decimal expressible as cents, including zero
pub fn cents() -> impl Strategy<Value = Decimal> {
    (0i64..=1_000_000).prop_map(|minor| Decimal::new(minor, 2))
}

/// Any payment status
pub fn payment_status() -> impl Strategy<Value = PaymentStatus> {
    prop_oneof![
        Just(PaymentStatus::Pending),
        Just(PaymentStatus::Confirmed),
        Just(PaymentStatus::Paid),
        Just(PaymentStatus::Failed),
        Just(PaymentStatus::InAnalysis),
    ]
}

/// Quantities a purchase realistically carries
pub fn quantity() -> impl Strategy<Value = u32> {
    1u32..=50
}
