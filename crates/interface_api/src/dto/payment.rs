//! Payment DTOs

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{Currency, Money};
use domain_purchase::Payment;
use domain_settlement::{CreatePaymentRequest, PaymentInstructions};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::purchase::{kebab, BuyerRequest};

#[derive(Debug, Default, Deserialize)]
pub struct OpenPaymentRequest {
    /// Payment amount for variable-price products; ignored otherwise
    pub amount: Option<Decimal>,
    /// Voucher code, required by the voucher method
    pub hash_code: Option<String>,
    /// Billing identity, required by the voucher method
    pub buyer: Option<BuyerRequest>,
}

impl OpenPaymentRequest {
    pub fn into_domain(self) -> CreatePaymentRequest {
        CreatePaymentRequest {
            amount: self.amount.map(|a| Money::new(a, Currency::BRL)),
            hash_code: self.hash_code,
            buyer: self.buyer.map(BuyerRequest::into_domain),
        }
    }
}

/// Instructions for finishing a freshly opened payment
#[derive(Debug, Serialize)]
pub struct OpenPaymentResponse {
    pub payment_id: String,
    pub instructions: PaymentInstructions,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub purchase_id: String,
    pub method: String,
    pub status: String,
    pub amount: Decimal,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PaymentResponse {
    pub fn from_payment(payment: &Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            purchase_id: payment.purchase_id.to_string(),
            method: payment.method.as_str().to_string(),
            status: kebab(&payment.status),
            amount: payment.amount.amount(),
            currency: payment.amount.currency().code().to_string(),
            due_date: payment.due_date,
            description: payment.description.clone(),
            created_at: payment.created_at,
        }
    }
}
