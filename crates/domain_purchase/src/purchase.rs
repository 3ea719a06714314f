//! Purchases and status recalculation
//!
//! A purchase tracks one commitment to buy a product until its outstanding
//! balance reaches zero. Its status is always *derived*: recalculation is a
//! pure function over the purchase and its payments, safe to run once per
//! notification retry.

use chrono::{DateTime, Utc};
use core_kernel::{AccountId, BuyerId, Money, ProductId, PurchaseId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::payment::Payment;
use crate::product::Product;

/// Purchase status state machine
///
/// `Pending` is the only mutable state. `Stale`, `Reimbursed` and
/// `Cancelled` are terminal; `DocumentInAnalysis` sits between a fully-paid
/// balance and `Paid` for categories that demand manual document review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PurchaseStatus {
    Pending,
    Paid,
    DocumentInAnalysis,
    Stale,
    Reimbursed,
    Cancelled,
}

impl PurchaseStatus {
    /// Returns true for states that no settlement event may leave
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseStatus::Stale | PurchaseStatus::Reimbursed | PurchaseStatus::Cancelled
        )
    }
}

/// Discriminates specialized purchase variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PurchaseKind {
    /// Ordinary single-seat purchase
    Single,
    /// Granted seat, nothing owed
    Exempt,
    /// Sponsor bundle that issues seat vouchers on settlement
    SponsorSeat,
    /// Seat bought with a discounted-category product
    DiscountedSeat,
    /// Open-ended donation
    Donation,
}

/// A customer's commitment to acquire one product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    /// Unique identifier
    pub id: PurchaseId,
    /// Product being bought
    pub product_id: ProductId,
    /// Account that owes and owns the purchase
    pub customer_id: AccountId,
    /// Billing identity (may differ from the customer)
    pub buyer_id: BuyerId,
    /// Variant discriminator
    pub kind: PurchaseKind,
    /// Derived status; mutated only through recalculation
    pub status: PurchaseStatus,
    /// Price per unit
    pub unit_price: Money,
    /// Number of units
    pub quantity: u32,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    /// Creates a new pending purchase
    pub fn new(
        product_id: ProductId,
        customer_id: AccountId,
        buyer_id: BuyerId,
        kind: PurchaseKind,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: PurchaseId::new_v7(),
            product_id,
            customer_id,
            buyer_id,
            kind,
            status: PurchaseStatus::Pending,
            unit_price,
            quantity,
            created_at: now,
            updated_at: now,
        }
    }

    /// Total the customer owes: unit price times quantity
    pub fn total_owed(&self) -> Money {
        self.unit_price.multiply(Decimal::from(self.quantity))
    }

    /// Sum of the paid portion of the given payments
    pub fn paid_amount(&self, payments: &[Payment]) -> Money {
        let sum: Decimal = payments
            .iter()
            .filter(|p| p.purchase_id == self.id)
            .map(|p| p.paid_amount().amount())
            .sum();
        Money::new(sum, self.unit_price.currency())
    }

    /// What remains to be paid
    pub fn outstanding_amount(&self, payments: &[Payment]) -> Money {
        Money::new(
            self.total_owed().amount() - self.paid_amount(payments).amount(),
            self.unit_price.currency(),
        )
    }

    /// Returns true once the purchase has been fully paid
    pub fn is_satisfied(&self) -> bool {
        self.status == PurchaseStatus::Paid
    }

    /// Returns true once the purchase has gone stale
    pub fn is_stale(&self) -> bool {
        self.status == PurchaseStatus::Stale
    }

    /// Returns true while a new payment may be started
    pub fn can_start_payment(&self, product: &Product, now: DateTime<Utc>) -> bool {
        !self.is_satisfied() && !self.status.is_terminal() && product.on_sale(now)
    }

    /// Returns true when the time-based stale policy should fire:
    /// past the sales deadline with nothing paid and nothing terminal
    pub fn could_be_stale(
        &self,
        product: &Product,
        payments: &[Payment],
        now: DateTime<Utc>,
    ) -> bool {
        self.status == PurchaseStatus::Pending
            && !product.on_sale(now)
            && self.paid_amount(payments).is_zero()
    }

    /// Recalculates the purchase status from its payments
    ///
    /// Pure and idempotent: the same payments always yield the same status,
    /// and terminal states are never left. A zero outstanding balance routes
    /// through `DocumentInAnalysis` instead of `Paid` when the product
    /// category demands manual document review; the explicit
    /// document-analyzed action performs that last hop.
    pub fn recalculated_status(
        &self,
        payments: &[Payment],
        requires_document_review: bool,
    ) -> PurchaseStatus {
        if self.status.is_terminal() {
            return self.status;
        }

        if self.outstanding_amount(payments).amount() <= Decimal::ZERO {
            match self.status {
                // only the explicit document-analyzed action finishes the hop
                PurchaseStatus::DocumentInAnalysis => PurchaseStatus::DocumentInAnalysis,
                PurchaseStatus::Paid => PurchaseStatus::Paid,
                _ if requires_document_review => PurchaseStatus::DocumentInAnalysis,
                _ => PurchaseStatus::Paid,
            }
        } else if self.status == PurchaseStatus::DocumentInAnalysis {
            PurchaseStatus::DocumentInAnalysis
        } else {
            PurchaseStatus::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::{Payment, PaymentDetails, PaymentMethod, PaymentStatus};
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn purchase(price: Decimal, qty: u32) -> Purchase {
        Purchase::new(
            ProductId::new(),
            AccountId::new(),
            BuyerId::new(),
            PurchaseKind::Single,
            Money::new(price, Currency::BRL),
            qty,
        )
    }

    fn paid_payment(purchase: &Purchase, amount: Decimal) -> Payment {
        let mut p = Payment::new(
            purchase.id,
            PaymentMethod::Cash,
            Money::new(amount, Currency::BRL),
            PaymentDetails::Cash {},
        );
        p.status = PaymentStatus::Paid;
        p
    }

    #[test]
    fn test_total_owed_is_unit_price_times_quantity() {
        let p = purchase(dec!(120.00), 3);
        assert_eq!(p.total_owed().amount(), dec!(360.00));
    }

    #[test]
    fn test_outstanding_shrinks_with_settled_payments() {
        let p = purchase(dec!(200.00), 1);
        let payment = paid_payment(&p, dec!(80.00));

        assert_eq!(p.outstanding_amount(&[payment]).amount(), dec!(120.00));
    }

    #[test]
    fn test_pending_payment_does_not_count() {
        let p = purchase(dec!(200.00), 1);
        let mut payment = paid_payment(&p, dec!(80.00));
        payment.status = PaymentStatus::Pending;

        assert_eq!(p.outstanding_amount(&[payment]).amount(), dec!(200.00));
    }

    #[test]
    fn test_recalculation_reaches_paid() {
        let p = purchase(dec!(200.00), 1);
        let payment = paid_payment(&p, dec!(200.00));

        assert_eq!(
            p.recalculated_status(&[payment], false),
            PurchaseStatus::Paid
        );
    }

    #[test]
    fn test_recalculation_is_idempotent() {
        let mut p = purchase(dec!(200.00), 1);
        let payment = paid_payment(&p, dec!(200.00));

        let first = p.recalculated_status(std::slice::from_ref(&payment), false);
        p.status = first;
        let second = p.recalculated_status(&[payment], false);

        assert_eq!(first, second);
    }

    #[test]
    fn test_document_gate_holds_before_paid() {
        let p = purchase(dec!(120.00), 1);
        let payment = paid_payment(&p, dec!(120.00));

        assert_eq!(
            p.recalculated_status(&[payment], true),
            PurchaseStatus::DocumentInAnalysis
        );
    }

    #[test]
    fn test_terminal_states_are_never_left() {
        let mut p = purchase(dec!(120.00), 1);
        p.status = PurchaseStatus::Stale;
        let payment = paid_payment(&p, dec!(120.00));

        assert_eq!(
            p.recalculated_status(&[payment], false),
            PurchaseStatus::Stale
        );
    }

    #[test]
    fn test_partial_payment_stays_pending() {
        let p = purchase(dec!(200.00), 1);
        let payment = paid_payment(&p, dec!(80.00));

        assert_eq!(
            p.recalculated_status(&[payment], false),
            PurchaseStatus::Pending
        );
    }
}
