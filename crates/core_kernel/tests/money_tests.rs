//! Behavioural tests for Money and Rate

use core_kernel::{Currency, Money, MoneyError, Rate};
use rust_decimal_macros::dec;

#[test]
fn money_rounds_to_currency_precision() {
    let m = Money::new(dec!(10.005), Currency::BRL);
    // banker's rounding at 2dp
    assert_eq!(m.amount(), dec!(10.00));

    let m = Money::new(dec!(10.015), Currency::BRL);
    assert_eq!(m.amount(), dec!(10.02));
}

#[test]
fn money_display_carries_currency_code() {
    let m = Money::new(dec!(120.00), Currency::BRL);
    assert_eq!(m.to_string(), "BRL 120.00");
}

#[test]
fn zero_money_is_zero() {
    assert!(Money::zero(Currency::BRL).is_zero());
    assert!(!Money::zero(Currency::BRL).is_positive());
}

#[test]
fn mixed_currency_subtraction_fails() {
    let brl = Money::new(dec!(50.00), Currency::BRL);
    let eur = Money::new(dec!(50.00), Currency::EUR);
    assert!(matches!(
        brl.checked_sub(&eur),
        Err(MoneyError::CurrencyMismatch(_, _))
    ));
}

#[test]
fn full_rate_keeps_amount_unchanged() {
    let total = Money::new(dec!(240.00), Currency::BRL);
    assert_eq!(Rate::full().apply(&total), total);
}

#[test]
fn fractional_rate_discounts_amount() {
    let total = Money::new(dec!(240.00), Currency::BRL);
    let half = Rate::new(dec!(0.5)).apply(&total);
    assert_eq!(half.amount(), dec!(120.00));
}
