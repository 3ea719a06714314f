//! Payments, polymorphic on settlement method
//!
//! The source system stored payments with single-table inheritance; here a
//! shared record carries a `PaymentDetails` tagged union selected by the
//! method discriminator, so status recalculation stays uniform across
//! methods.

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{Money, PaymentId, PurchaseId, Rate, VoucherId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::transition::Transition;

/// Settlement channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    /// In-person, operator-attested
    Cash,
    /// Offline bank slip cleared in batches
    BankSlip,
    /// Redirect gateway with server-to-server notification codes
    WebCheckout,
    /// Redirect gateway with token/payer-id express flow
    ExpressCheckout,
    /// Internal discount voucher, not a monetary settlement
    Voucher,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankSlip => "bank-slip",
            PaymentMethod::WebCheckout => "web-checkout",
            PaymentMethod::ExpressCheckout => "express-checkout",
            PaymentMethod::Voucher => "voucher",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "bank-slip" => Ok(PaymentMethod::BankSlip),
            "web-checkout" => Ok(PaymentMethod::WebCheckout),
            "express-checkout" => Ok(PaymentMethod::ExpressCheckout),
            "voucher" => Ok(PaymentMethod::Voucher),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Paid,
    Failed,
    InAnalysis,
}

impl PaymentStatus {
    /// Statuses whose amount counts toward the purchase balance
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Confirmed)
    }
}

/// Method-specific payment fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum PaymentDetails {
    Cash {},
    BankSlip {
        /// Bank-facing sequential reference ("our number")
        our_number: String,
        /// Hash used to retrieve the printable slip
        document_hash: String,
        /// Clearings dated after this day are late
        legal_due_date: NaiveDate,
    },
    WebCheckout {
        /// Correlation reference sent to the gateway
        reference: String,
        /// Checkout-session code returned by the gateway
        checkout_code: Option<String>,
    },
    ExpressCheckout {
        /// Invoice number sent to the gateway
        invoice_number: String,
        /// Express-checkout token
        token: Option<String>,
        /// Gateway correlation id
        correlation_id: Option<String>,
    },
    Voucher {
        voucher_id: VoucherId,
        hash_code: String,
        discount: Rate,
    },
}

impl PaymentDetails {
    /// The method this detail block belongs to
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentDetails::Cash {} => PaymentMethod::Cash,
            PaymentDetails::BankSlip { .. } => PaymentMethod::BankSlip,
            PaymentDetails::WebCheckout { .. } => PaymentMethod::WebCheckout,
            PaymentDetails::ExpressCheckout { .. } => PaymentMethod::ExpressCheckout,
            PaymentDetails::Voucher { .. } => PaymentMethod::Voucher,
        }
    }
}

/// One attempt to cover some or all of a purchase's balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Owning purchase
    pub purchase_id: PurchaseId,
    /// Settlement channel
    pub method: PaymentMethod,
    /// Derived status; mutated only by transition application
    pub status: PaymentStatus,
    /// Amount this payment covers
    pub amount: Money,
    /// Printed due date, where the method has one
    pub due_date: Option<NaiveDate>,
    /// Human-readable description
    pub description: Option<String>,
    /// Method-specific fields
    pub details: PaymentDetails,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new pending payment
    pub fn new(
        purchase_id: PurchaseId,
        method: PaymentMethod,
        amount: Money,
        details: PaymentDetails,
    ) -> Self {
        debug_assert_eq!(method, details.method());

        Self {
            id: PaymentId::new_v7(),
            purchase_id,
            method,
            status: PaymentStatus::Pending,
            amount,
            due_date: None,
            description: None,
            details,
            created_at: Utc::now(),
        }
    }

    /// Sets the printed due date
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The portion of this payment that counts toward the purchase balance
    pub fn paid_amount(&self) -> Money {
        if self.status.is_settled() {
            self.amount
        } else {
            Money::zero(self.amount.currency())
        }
    }

    /// Recalculates status from the transition history
    ///
    /// The current status is the `new_status` of the most recent transition,
    /// ordered by creation time with ties broken by insertion order; with no
    /// transitions the stored status stands. Pure: calling it twice over the
    /// same history yields the same result.
    pub fn recalculated_status(&self, transitions: &[Transition]) -> PaymentStatus {
        transitions
            .iter()
            .filter(|t| t.payment_id == self.id)
            .max_by_key(|t| t.created_at)
            .map(|t| t.new_status)
            .unwrap_or(self.status)
    }

    /// Bank-slip legal due date, when this is a slip payment
    pub fn legal_due_date(&self) -> Option<NaiveDate> {
        match &self.details {
            PaymentDetails::BankSlip { legal_due_date, .. } => Some(*legal_due_date),
            _ => None,
        }
    }
}
