//! Product collaborator records
//!
//! The product catalog itself lives outside the core; the ledger only needs
//! the slice of product data that drives pricing, eligibility and due-date
//! policy.

use chrono::{DateTime, Utc};
use core_kernel::{Currency, Money, ProductId};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::buyer::{Buyer, BuyerKind};

/// Product category, driving purchase policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductCategory {
    /// Regular attendee seat
    General,
    /// Discounted seat requiring proof-of-enrolment review
    Student,
    /// Sponsor bundle; settling one grants seat vouchers
    Corporate,
    /// Public-sector seat paid by commitment note, document-gated
    Government,
    /// Open-ended donation
    Donation,
}

impl ProductCategory {
    /// Categories whose purchases pass through a manual-document gate
    /// before reaching `Paid`
    pub fn requires_document_review(&self) -> bool {
        matches!(self, ProductCategory::Student | ProductCategory::Government)
    }

    /// Categories whose settlement issues seat vouchers to the buyer
    pub fn grants_vouchers(&self) -> bool {
        matches!(self, ProductCategory::Corporate)
    }
}

/// The slice of a catalog product the ledger cares about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier
    pub id: ProductId,
    /// Human-readable description
    pub description: String,
    /// Category
    pub category: ProductCategory,
    /// Unit price; zero for variable-price products
    pub price: Money,
    /// Sales deadline; purchases cannot start payments after this
    pub sold_until: DateTime<Utc>,
    /// Days between a slip's creation and its printed due date; clearings
    /// dated after that day are late
    pub slip_due_days: u32,
    /// True when the price is chosen by the buyer (open-ended donations)
    pub variable_price: bool,
    /// Floor for variable-price amounts
    pub minimum_amount: Money,
    /// Restricts voucher redemption to one buyer kind, when set
    pub voucher_audience: Option<BuyerKind>,
}

impl Product {
    /// Creates a fixed-price product
    pub fn new(
        description: impl Into<String>,
        category: ProductCategory,
        price: Money,
        sold_until: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ProductId::new_v7(),
            description: description.into(),
            category,
            price,
            sold_until,
            slip_due_days: 3,
            variable_price: false,
            minimum_amount: Money::new(dec!(10), Currency::BRL),
            voucher_audience: None,
        }
    }

    /// Creates a variable-price donation product
    pub fn donation(description: impl Into<String>, sold_until: DateTime<Utc>) -> Self {
        let mut product = Self::new(
            description,
            ProductCategory::Donation,
            Money::zero(Currency::BRL),
            sold_until,
        );
        product.variable_price = true;
        product
    }

    /// Restricts vouchers for this product to one buyer kind
    pub fn with_voucher_audience(mut self, audience: BuyerKind) -> Self {
        self.voucher_audience = Some(audience);
        self
    }

    /// Returns true while the product can still start payments
    pub fn on_sale(&self, now: DateTime<Utc>) -> bool {
        now <= self.sold_until
    }

    /// Checks whether a buyer may purchase this product
    pub fn check_eligibility(&self, buyer: &Buyer) -> bool {
        match self.category {
            ProductCategory::Corporate => buyer.kind == BuyerKind::Company,
            ProductCategory::Government => buyer.kind == BuyerKind::Government,
            _ => true,
        }
    }

    /// Checks whether a buyer may redeem a voucher for this product
    pub fn check_voucher_eligibility(&self, buyer: &Buyer) -> bool {
        match self.voucher_audience {
            Some(audience) => buyer.kind == audience,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn tomorrow() -> DateTime<Utc> {
        Utc::now().checked_add_days(Days::new(1)).unwrap()
    }

    #[test]
    fn test_document_gate_categories() {
        assert!(ProductCategory::Student.requires_document_review());
        assert!(ProductCategory::Government.requires_document_review());
        assert!(!ProductCategory::General.requires_document_review());
        assert!(!ProductCategory::Donation.requires_document_review());
    }

    #[test]
    fn test_corporate_product_rejects_person_buyer() {
        let product = Product::new(
            "Sponsor bundle",
            ProductCategory::Corporate,
            Money::new(dec!(5000), Currency::BRL),
            tomorrow(),
        );
        let person = Buyer::new(BuyerKind::Person, "Ada");
        let company = Buyer::new(BuyerKind::Company, "Acme");

        assert!(!product.check_eligibility(&person));
        assert!(product.check_eligibility(&company));
    }

    #[test]
    fn test_voucher_audience_restriction() {
        let product = Product::new(
            "Seat",
            ProductCategory::General,
            Money::new(dec!(240), Currency::BRL),
            tomorrow(),
        )
        .with_voucher_audience(BuyerKind::Company);

        let person = Buyer::new(BuyerKind::Person, "Ada");
        let company = Buyer::new(BuyerKind::Company, "Acme");

        assert!(!product.check_voucher_eligibility(&person));
        assert!(product.check_voucher_eligibility(&company));
    }

    #[test]
    fn test_donation_is_variable_price() {
        let product = Product::donation("Support the event", tomorrow());
        assert!(product.variable_price);
        assert!(product.price.is_zero());
    }
}
