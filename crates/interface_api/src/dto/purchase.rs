//! Purchase DTOs

use chrono::{DateTime, Utc};
use core_kernel::{Currency, Money};
use domain_purchase::{Address, Buyer, BuyerKind, Payment, Purchase};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Billing identity sent with purchase and voucher requests
#[derive(Debug, Deserialize, Validate)]
pub struct BuyerRequest {
    pub kind: BuyerKind,
    #[validate(length(min = 1))]
    pub name: String,
    pub document: Option<String>,
    pub contact: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

impl BuyerRequest {
    pub fn into_domain(self) -> Buyer {
        let mut buyer = Buyer::new(self.kind, self.name);
        if let Some(document) = self.document {
            buyer = buyer.with_document(document);
        }
        buyer.contact = self.contact;
        if let Some(address) = self.address {
            buyer = buyer.with_address(address);
        }
        buyer
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePurchaseRequest {
    pub product_id: Uuid,
    pub customer_id: Uuid,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    pub quantity: u32,
    /// Unit price for variable-price products; ignored otherwise
    pub amount: Option<Decimal>,
    #[validate(nested)]
    pub buyer: BuyerRequest,
}

fn default_quantity() -> u32 {
    1
}

impl CreatePurchaseRequest {
    pub fn amount_as_money(&self) -> Option<Money> {
        self.amount.map(|a| Money::new(a, Currency::BRL))
    }
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub id: String,
    pub product_id: String,
    pub customer_id: String,
    pub kind: String,
    pub status: String,
    pub unit_price: Decimal,
    pub currency: String,
    pub quantity: u32,
    pub total_owed: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outstanding_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseResponse {
    pub fn from_purchase(purchase: &Purchase) -> Self {
        Self {
            id: purchase.id.to_string(),
            product_id: purchase.product_id.to_string(),
            customer_id: purchase.customer_id.to_string(),
            kind: kebab(&purchase.kind),
            status: kebab(&purchase.status),
            unit_price: purchase.unit_price.amount(),
            currency: purchase.unit_price.currency().code().to_string(),
            quantity: purchase.quantity,
            total_owed: purchase.total_owed().amount(),
            paid_amount: None,
            outstanding_amount: None,
            created_at: purchase.created_at,
            updated_at: purchase.updated_at,
        }
    }

    /// Adds the balance figures derived from the purchase's payments
    pub fn with_balance(mut self, purchase: &Purchase, payments: &[Payment]) -> Self {
        self.paid_amount = Some(purchase.paid_amount(payments).amount());
        self.outstanding_amount = Some(purchase.outstanding_amount(payments).amount());
        self
    }
}

/// Renders a unit-variant enum in its serde (kebab-case) form
pub(crate) fn kebab<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => "unknown".to_string(),
    }
}
