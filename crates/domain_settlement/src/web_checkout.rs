//! Web-checkout gateway settlement
//!
//! The first of the two redirect gateways. `process` opens a checkout
//! session and sends the user to the gateway; settlement arrives later as a
//! server-to-server notification carrying a `notificationCode`, which is
//! resolved back into a transaction by a second round trip. The reported
//! status is trusted only after the transaction's reference matches the
//! payment's own.

use std::sync::Arc;

use async_trait::async_trait;
use core_kernel::Money;
use domain_purchase::{
    LedgerStore, Payment, PaymentDetails, PaymentMethod, PaymentStatus, Product, Purchase,
    Transition, TransitionSource,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::SettlementError;
use crate::gateway::{GatewayConfig, GatewayError};
use crate::processor::{
    payload_json, CreatePaymentRequest, NotificationPayload, PaymentInstructions, PaymentProcessor,
};

const GATEWAY_NAME: &str = "web-checkout";

/// Status vocabulary of the web-checkout gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStatus {
    WaitingPayment,
    InAnalysis,
    Paid,
    Available,
    Disputed,
    Refunded,
    Cancelled,
}

impl CheckoutStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "WAITING_PAYMENT" => Some(CheckoutStatus::WaitingPayment),
            "IN_ANALYSIS" => Some(CheckoutStatus::InAnalysis),
            "PAID" => Some(CheckoutStatus::Paid),
            "AVAILABLE" => Some(CheckoutStatus::Available),
            "DISPUTED" => Some(CheckoutStatus::Disputed),
            "REFUNDED" => Some(CheckoutStatus::Refunded),
            "CANCELLED" => Some(CheckoutStatus::Cancelled),
            _ => None,
        }
    }

    /// Maps the gateway vocabulary onto the canonical payment status set
    pub fn canonical(&self) -> PaymentStatus {
        match self {
            CheckoutStatus::WaitingPayment => PaymentStatus::Pending,
            CheckoutStatus::InAnalysis | CheckoutStatus::Disputed => PaymentStatus::InAnalysis,
            CheckoutStatus::Paid | CheckoutStatus::Available => PaymentStatus::Paid,
            CheckoutStatus::Refunded | CheckoutStatus::Cancelled => PaymentStatus::Failed,
        }
    }
}

/// An open checkout session at the gateway
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub code: String,
    pub redirect_url: String,
}

/// A transaction as reported by the gateway
#[derive(Debug, Clone)]
pub struct CheckoutTransaction {
    /// Merchant reference the gateway echoes back
    pub reference: String,
    pub status: CheckoutStatus,
    pub gross_amount: Option<Decimal>,
}

/// Client contract for the web-checkout gateway
#[async_trait]
pub trait CheckoutGatewayApi: Send + Sync {
    /// Opens a checkout session for the payment
    async fn create_session(
        &self,
        reference: &str,
        amount: &Money,
        description: &str,
    ) -> Result<CheckoutSession, GatewayError>;

    /// Resolves a notification code into the transaction it refers to
    async fn lookup_notification(&self, code: &str) -> Result<CheckoutTransaction, GatewayError>;

    /// Looks a transaction up by its own code
    async fn lookup_transaction(&self, code: &str) -> Result<CheckoutTransaction, GatewayError>;
}

#[derive(Deserialize)]
struct SessionResponse {
    code: String,
    redirect_url: String,
}

#[derive(Deserialize)]
struct TransactionResponse {
    reference: String,
    status: String,
    gross_amount: Option<Decimal>,
}

impl TransactionResponse {
    fn into_transaction(self) -> Result<CheckoutTransaction, GatewayError> {
        let status = CheckoutStatus::parse(&self.status).ok_or_else(|| {
            GatewayError::unexpected_response(format!("unknown status {:?}", self.status))
        })?;
        Ok(CheckoutTransaction {
            reference: self.reference,
            status,
            gross_amount: self.gross_amount,
        })
    }
}

/// reqwest-backed gateway client
pub struct HttpCheckoutGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl HttpCheckoutGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = config.build_client()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl CheckoutGatewayApi for HttpCheckoutGateway {
    async fn create_session(
        &self,
        reference: &str,
        amount: &Money,
        description: &str,
    ) -> Result<CheckoutSession, GatewayError> {
        let response = self
            .client
            .post(format!("{}/sessions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "reference": reference,
                "amount": amount.amount(),
                "currency": amount.currency().code(),
                "description": description,
            }))
            .send()
            .await?
            .error_for_status()?;

        let session: SessionResponse = response.json().await?;
        Ok(CheckoutSession {
            code: session.code,
            redirect_url: session.redirect_url,
        })
    }

    async fn lookup_notification(&self, code: &str) -> Result<CheckoutTransaction, GatewayError> {
        let response = self
            .client
            .get(format!("{}/notifications/{code}", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?
            .error_for_status()?;

        response
            .json::<TransactionResponse>()
            .await?
            .into_transaction()
    }

    async fn lookup_transaction(&self, code: &str) -> Result<CheckoutTransaction, GatewayError> {
        let response = self
            .client
            .get(format!("{}/transactions/{code}", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?
            .error_for_status()?;

        response
            .json::<TransactionResponse>()
            .await?
            .into_transaction()
    }
}

pub struct WebCheckoutProcessor {
    store: Arc<dyn LedgerStore>,
    gateway: Arc<dyn CheckoutGatewayApi>,
}

impl WebCheckoutProcessor {
    pub fn new(store: Arc<dyn LedgerStore>, gateway: Arc<dyn CheckoutGatewayApi>) -> Self {
        Self { store, gateway }
    }

    /// Resolves the payload into a gateway transaction: a notification code
    /// on the callback path, a transaction code on the return path
    async fn resolve_transaction(
        &self,
        payload: &NotificationPayload,
    ) -> Result<CheckoutTransaction, SettlementError> {
        if let Some(code) = payload.get("notificationCode") {
            return self
                .gateway
                .lookup_notification(code)
                .await
                .map_err(|e| SettlementError::external(GATEWAY_NAME, e));
        }
        if let Some(code) = payload.get("transactionCode") {
            return self
                .gateway
                .lookup_transaction(code)
                .await
                .map_err(|e| SettlementError::external(GATEWAY_NAME, e));
        }
        Err(SettlementError::invalid_notification(
            "payload carries neither notificationCode nor transactionCode",
        ))
    }

    fn reference_of(payment: &Payment) -> Result<&str, SettlementError> {
        match &payment.details {
            PaymentDetails::WebCheckout { reference, .. } => Ok(reference),
            _ => Err(SettlementError::invalid_notification(
                "payment does not carry web-checkout details",
            )),
        }
    }
}

/// Builds the merchant reference echoed back by the gateway
pub fn checkout_reference(purchase: &Purchase, sequence: u64) -> String {
    let customer = purchase.customer_id.as_uuid().simple().to_string();
    let number = purchase.id.as_uuid().simple().to_string();
    format!("TSR-A{}-PU{}-PA{:05}", &customer[..8], &number[..8], sequence)
}

#[async_trait]
impl PaymentProcessor for WebCheckoutProcessor {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::WebCheckout
    }

    async fn create(
        &self,
        purchase: &Purchase,
        product: &Product,
        amount: Money,
        _request: &CreatePaymentRequest,
    ) -> Result<Payment, SettlementError> {
        let sequence = self.store.next_payment_sequence().await?;
        let details = PaymentDetails::WebCheckout {
            reference: checkout_reference(purchase, sequence),
            checkout_code: None,
        };

        Ok(
            Payment::new(purchase.id, PaymentMethod::WebCheckout, amount, details)
                .with_description(format!("Web checkout for {}", product.description)),
        )
    }

    async fn process(
        &self,
        payment: &mut Payment,
        _purchase: &Purchase,
    ) -> Result<PaymentInstructions, SettlementError> {
        let reference = Self::reference_of(payment)?.to_string();
        let description = payment.description.clone().unwrap_or_default();

        let session = self
            .gateway
            .create_session(&reference, &payment.amount, &description)
            .await
            .map_err(|e| SettlementError::external(GATEWAY_NAME, e))?;
        debug!(payment_id = %payment.id, code = %session.code, "checkout session opened");

        if let PaymentDetails::WebCheckout { checkout_code, .. } = &mut payment.details {
            *checkout_code = Some(session.code);
        }

        Ok(PaymentInstructions::Redirect {
            url: session.redirect_url,
        })
    }

    async fn notify(
        &self,
        _purchase: &Purchase,
        payment: &Payment,
        payload: &NotificationPayload,
        source: TransitionSource,
    ) -> Result<Transition, SettlementError> {
        // round trip first; no store lock is held here
        let transaction = self.resolve_transaction(payload).await?;

        let reference = Self::reference_of(payment)?;
        if transaction.reference != reference {
            warn!(
                payment_id = %payment.id,
                reported = %transaction.reference,
                "reference mismatch in checkout notification"
            );
            return Err(SettlementError::invalid_notification(
                "transaction reference does not match the payment",
            ));
        }

        Ok(Transition::new(
            payment.id,
            payment.status,
            transaction.status.canonical(),
            source,
            payload_json(payload),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_vocabulary_maps_to_canonical_set() {
        assert_eq!(
            CheckoutStatus::parse("WAITING_PAYMENT").unwrap().canonical(),
            PaymentStatus::Pending
        );
        assert_eq!(
            CheckoutStatus::parse("AVAILABLE").unwrap().canonical(),
            PaymentStatus::Paid
        );
        assert_eq!(
            CheckoutStatus::parse("REFUNDED").unwrap().canonical(),
            PaymentStatus::Failed
        );
        assert_eq!(
            CheckoutStatus::parse("DISPUTED").unwrap().canonical(),
            PaymentStatus::InAnalysis
        );
        assert!(CheckoutStatus::parse("SOMETHING_ELSE").is_none());
    }

    #[test]
    fn test_reference_embeds_customer_purchase_and_sequence() {
        let purchase = Purchase::new(
            core_kernel::ProductId::new(),
            core_kernel::AccountId::new(),
            core_kernel::BuyerId::new(),
            domain_purchase::PurchaseKind::Single,
            Money::new(rust_decimal_macros::dec!(120), core_kernel::Currency::BRL),
            1,
        );

        let reference = checkout_reference(&purchase, 42);
        assert!(reference.starts_with("TSR-A"));
        assert!(reference.ends_with("-PA00042"));
    }
}
