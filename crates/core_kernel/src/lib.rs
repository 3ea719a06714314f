//! Core Kernel - Foundational types for the registration platform
//!
//! This crate provides the building blocks shared by all domain modules:
//! - Money types with precise decimal arithmetic
//! - Day-granularity validity windows for promotional codes and due dates
//! - Strongly-typed identifiers

pub mod error;
pub mod identifiers;
pub mod money;
pub mod temporal;

pub use error::CoreError;
pub use identifiers::{
    AccountId, BuyerId, PaymentId, ProductId, PurchaseId, TransitionId, VoucherId,
};
pub use money::{Currency, Money, MoneyError, Rate};
pub use temporal::{TemporalError, ValidityWindow};
