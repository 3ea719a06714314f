//! Buyer records
//!
//! A buyer is the billing/legal identity behind a purchase. It may differ
//! from the customer account (e.g., a company paying for an employee's
//! seat).

use chrono::{DateTime, Utc};
use core_kernel::BuyerId;
use serde::{Deserialize, Serialize};

/// Legal classification of a buyer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuyerKind {
    Person,
    Company,
    Government,
}

/// Billing address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub number: String,
    pub extra: Option<String>,
    pub zipcode: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

/// The billing identity behind a purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Buyer {
    /// Unique identifier
    pub id: BuyerId,
    /// Legal classification
    pub kind: BuyerKind,
    /// Legal name
    pub name: String,
    /// Tax/identity document number
    pub document: Option<String>,
    /// Contact phone or e-mail
    pub contact: Option<String>,
    /// Billing address
    pub address: Address,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Buyer {
    /// Creates a new buyer
    pub fn new(kind: BuyerKind, name: impl Into<String>) -> Self {
        Self {
            id: BuyerId::new_v7(),
            kind,
            name: name.into(),
            document: None,
            contact: None,
            address: Address::default(),
            created_at: Utc::now(),
        }
    }

    /// Sets the document number
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Sets the billing address
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    /// Returns true if a legal document number is present
    pub fn has_document(&self) -> bool {
        self.document.as_deref().is_some_and(|d| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buyer_without_document() {
        let buyer = Buyer::new(BuyerKind::Person, "Ada");
        assert!(!buyer.has_document());
    }

    #[test]
    fn test_buyer_with_empty_document() {
        let buyer = Buyer::new(BuyerKind::Person, "Ada").with_document("");
        assert!(!buyer.has_document());
    }

    #[test]
    fn test_buyer_with_document() {
        let buyer = Buyer::new(BuyerKind::Company, "Acme").with_document("12345678000195");
        assert!(buyer.has_document());
    }
}
