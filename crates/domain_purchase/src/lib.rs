//! Purchase Ledger Domain
//!
//! This crate tracks what an attendee owes and what has been received:
//! a `Purchase` is a commitment to buy one product, paid down by one or
//! more `Payment`s, each of which carries an append-only `Transition`
//! audit trail. Status is never stored authoritatively anywhere else:
//! a payment's status is derivable from its most recent transition, and
//! a purchase's status from the sum of its settled payments.
//!
//! # Invariants
//!
//! - `total_owed = unit_price × quantity`
//! - `outstanding = total_owed − Σ paid_amount(settled payments)`
//! - Transitions are append-only; recalculation is pure and idempotent
//! - A voucher is consumed by at most one payment
//!
//! All mutation of the ledger goes through the `LedgerStore` port; callers
//! never write purchase or payment rows directly.

pub mod buyer;
pub mod error;
pub mod payment;
pub mod ports;
pub mod product;
pub mod purchase;
pub mod transition;
pub mod voucher;

pub use buyer::{Address, Buyer, BuyerKind};
pub use error::PurchaseError;
pub use payment::{Payment, PaymentDetails, PaymentMethod, PaymentStatus};
pub use ports::{LedgerStore, ProductCatalog, SettlementCommit, StoreError};
pub use product::{Product, ProductCategory};
pub use purchase::{Purchase, PurchaseKind, PurchaseStatus};
pub use transition::{SettlementTag, Transition, TransitionSource};
pub use voucher::{DiscountResolver, Voucher, VoucherBatch};
