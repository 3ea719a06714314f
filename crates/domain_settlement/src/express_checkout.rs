//! Express-checkout gateway settlement
//!
//! The second redirect gateway uses a token flow: `process` sets up a
//! checkout and stores the returned token; the user comes back with that
//! token plus a payer id. A details lookup reports the action status, and a
//! still-pending action with a payer id at hand triggers the capture call
//! before the transition is decided.

use std::sync::Arc;

use async_trait::async_trait;
use core_kernel::Money;
use domain_purchase::{
    LedgerStore, Payment, PaymentDetails, PaymentMethod, PaymentStatus, Product, Purchase,
    Transition, TransitionSource,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::SettlementError;
use crate::gateway::{GatewayConfig, GatewayError};
use crate::processor::{
    payload_json, CreatePaymentRequest, NotificationPayload, PaymentInstructions, PaymentProcessor,
};

const GATEWAY_NAME: &str = "express-checkout";

/// Payment-action vocabulary of the express gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressStatus {
    NotInitiated,
    InProgress,
    Completed,
    Failed,
}

impl ExpressStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PaymentActionNotInitiated" => Some(ExpressStatus::NotInitiated),
            "PaymentActionInProgress" => Some(ExpressStatus::InProgress),
            "PaymentActionCompleted" => Some(ExpressStatus::Completed),
            "PaymentActionFailed" => Some(ExpressStatus::Failed),
            _ => None,
        }
    }

    /// Maps the gateway vocabulary onto the canonical payment status set
    pub fn canonical(&self) -> PaymentStatus {
        match self {
            ExpressStatus::NotInitiated => PaymentStatus::Pending,
            ExpressStatus::InProgress => PaymentStatus::InAnalysis,
            ExpressStatus::Completed => PaymentStatus::Paid,
            ExpressStatus::Failed => PaymentStatus::Failed,
        }
    }
}

/// Result of opening an express checkout
#[derive(Debug, Clone)]
pub struct ExpressCheckoutSetup {
    pub token: String,
    pub redirect_url: String,
}

/// Details the gateway reports for a token
#[derive(Debug, Clone)]
pub struct ExpressDetails {
    pub token: String,
    /// Merchant invoice number echoed back, when the gateway has one
    pub invoice_number: Option<String>,
    pub payer_id: Option<String>,
    pub status: ExpressStatus,
    pub correlation_id: Option<String>,
}

/// Result of the capture call
#[derive(Debug, Clone)]
pub struct ExpressCapture {
    pub status: ExpressStatus,
    pub transaction_id: Option<String>,
}

/// Client contract for the express gateway
#[async_trait]
pub trait ExpressGatewayApi: Send + Sync {
    /// Opens a checkout and returns the token plus approval redirect
    async fn set_checkout(
        &self,
        invoice_number: &str,
        amount: &Money,
        description: &str,
    ) -> Result<ExpressCheckoutSetup, GatewayError>;

    /// Reports the current state of a token
    async fn checkout_details(&self, token: &str) -> Result<ExpressDetails, GatewayError>;

    /// Captures a checkout the payer already approved
    async fn do_checkout(
        &self,
        token: &str,
        payer_id: &str,
        amount: &Money,
    ) -> Result<ExpressCapture, GatewayError>;
}

#[derive(Deserialize)]
struct SetupResponse {
    token: String,
    redirect_url: String,
}

#[derive(Deserialize)]
struct DetailsResponse {
    token: String,
    invoice_number: Option<String>,
    payer_id: Option<String>,
    status: String,
    correlation_id: Option<String>,
}

#[derive(Deserialize)]
struct CaptureResponse {
    status: String,
    transaction_id: Option<String>,
}

/// reqwest-backed gateway client
pub struct HttpExpressGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl HttpExpressGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = config.build_client()?;
        Ok(Self { config, client })
    }

    fn parse_status(raw: &str) -> Result<ExpressStatus, GatewayError> {
        ExpressStatus::parse(raw)
            .ok_or_else(|| GatewayError::unexpected_response(format!("unknown status {raw:?}")))
    }
}

#[async_trait]
impl ExpressGatewayApi for HttpExpressGateway {
    async fn set_checkout(
        &self,
        invoice_number: &str,
        amount: &Money,
        description: &str,
    ) -> Result<ExpressCheckoutSetup, GatewayError> {
        let response = self
            .client
            .post(format!("{}/express-checkout", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "invoice_number": invoice_number,
                "amount": amount.amount(),
                "currency": amount.currency().code(),
                "description": description,
            }))
            .send()
            .await?
            .error_for_status()?;

        let setup: SetupResponse = response.json().await?;
        Ok(ExpressCheckoutSetup {
            token: setup.token,
            redirect_url: setup.redirect_url,
        })
    }

    async fn checkout_details(&self, token: &str) -> Result<ExpressDetails, GatewayError> {
        let response = self
            .client
            .get(format!(
                "{}/express-checkout/{token}",
                self.config.base_url
            ))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?
            .error_for_status()?;

        let details: DetailsResponse = response.json().await?;
        Ok(ExpressDetails {
            status: Self::parse_status(&details.status)?,
            token: details.token,
            invoice_number: details.invoice_number,
            payer_id: details.payer_id,
            correlation_id: details.correlation_id,
        })
    }

    async fn do_checkout(
        &self,
        token: &str,
        payer_id: &str,
        amount: &Money,
    ) -> Result<ExpressCapture, GatewayError> {
        let response = self
            .client
            .post(format!(
                "{}/express-checkout/{token}/capture",
                self.config.base_url
            ))
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "payer_id": payer_id,
                "amount": amount.amount(),
                "currency": amount.currency().code(),
            }))
            .send()
            .await?
            .error_for_status()?;

        let capture: CaptureResponse = response.json().await?;
        Ok(ExpressCapture {
            status: Self::parse_status(&capture.status)?,
            transaction_id: capture.transaction_id,
        })
    }
}

pub struct ExpressCheckoutProcessor {
    store: Arc<dyn LedgerStore>,
    gateway: Arc<dyn ExpressGatewayApi>,
}

impl ExpressCheckoutProcessor {
    pub fn new(store: Arc<dyn LedgerStore>, gateway: Arc<dyn ExpressGatewayApi>) -> Self {
        Self { store, gateway }
    }

    fn details_of(payment: &Payment) -> Result<(&str, Option<&str>), SettlementError> {
        match &payment.details {
            PaymentDetails::ExpressCheckout {
                invoice_number,
                token,
                ..
            } => Ok((invoice_number, token.as_deref())),
            _ => Err(SettlementError::invalid_notification(
                "payment does not carry express-checkout details",
            )),
        }
    }
}

/// Builds the merchant invoice number echoed back by the gateway
pub fn express_invoice_number(purchase: &Purchase) -> String {
    let customer = purchase.customer_id.as_uuid().simple().to_string();
    let number = purchase.id.as_uuid().simple().to_string();
    format!("A{}PU{}", &customer[..8], &number[..8])
}

#[async_trait]
impl PaymentProcessor for ExpressCheckoutProcessor {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::ExpressCheckout
    }

    async fn create(
        &self,
        purchase: &Purchase,
        product: &Product,
        amount: Money,
        _request: &CreatePaymentRequest,
    ) -> Result<Payment, SettlementError> {
        // the sequence keeps invoice numbers unique across retried payments
        let sequence = self.store.next_payment_sequence().await?;
        let details = PaymentDetails::ExpressCheckout {
            invoice_number: format!("{}-{:05}", express_invoice_number(purchase), sequence),
            token: None,
            correlation_id: None,
        };

        Ok(
            Payment::new(purchase.id, PaymentMethod::ExpressCheckout, amount, details)
                .with_description(format!("Express checkout for {}", product.description)),
        )
    }

    async fn process(
        &self,
        payment: &mut Payment,
        _purchase: &Purchase,
    ) -> Result<PaymentInstructions, SettlementError> {
        let (invoice_number, _) = Self::details_of(payment)?;
        let invoice_number = invoice_number.to_string();
        let description = payment.description.clone().unwrap_or_default();

        let setup = self
            .gateway
            .set_checkout(&invoice_number, &payment.amount, &description)
            .await
            .map_err(|e| SettlementError::external(GATEWAY_NAME, e))?;
        debug!(payment_id = %payment.id, token = %setup.token, "express checkout opened");

        if let PaymentDetails::ExpressCheckout { token, .. } = &mut payment.details {
            *token = Some(setup.token);
        }

        Ok(PaymentInstructions::Redirect {
            url: setup.redirect_url,
        })
    }

    async fn notify(
        &self,
        _purchase: &Purchase,
        payment: &Payment,
        payload: &NotificationPayload,
        source: TransitionSource,
    ) -> Result<Transition, SettlementError> {
        let (invoice_number, stored_token) = Self::details_of(payment)?;

        let token = payload
            .get("token")
            .ok_or_else(|| SettlementError::invalid_notification("missing token"))?;
        match stored_token {
            Some(stored) if stored == token => {}
            _ => {
                warn!(payment_id = %payment.id, "token mismatch in express notification");
                return Err(SettlementError::invalid_notification(
                    "token does not match the payment",
                ));
            }
        }

        let details = self
            .gateway
            .checkout_details(token)
            .await
            .map_err(|e| SettlementError::external(GATEWAY_NAME, e))?;

        if let Some(reported) = &details.invoice_number {
            if reported != invoice_number {
                return Err(SettlementError::invalid_notification(
                    "invoice number does not match the payment",
                ));
            }
        }

        // an approved-but-uncaptured checkout is captured right here
        let payer_id = details
            .payer_id
            .clone()
            .or_else(|| payload.get("PayerID").cloned());
        let status = if details.status.canonical() == PaymentStatus::Pending {
            match payer_id {
                Some(payer_id) => {
                    let capture = self
                        .gateway
                        .do_checkout(token, &payer_id, &payment.amount)
                        .await
                        .map_err(|e| SettlementError::external(GATEWAY_NAME, e))?;
                    capture.status
                }
                None => details.status,
            }
        } else {
            details.status
        };

        Ok(Transition::new(
            payment.id,
            payment.status,
            status.canonical(),
            source,
            payload_json(payload),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_vocabulary_maps_to_canonical_set() {
        assert_eq!(
            ExpressStatus::parse("PaymentActionNotInitiated")
                .unwrap()
                .canonical(),
            PaymentStatus::Pending
        );
        assert_eq!(
            ExpressStatus::parse("PaymentActionCompleted")
                .unwrap()
                .canonical(),
            PaymentStatus::Paid
        );
        assert_eq!(
            ExpressStatus::parse("PaymentActionFailed")
                .unwrap()
                .canonical(),
            PaymentStatus::Failed
        );
        assert!(ExpressStatus::parse("SomethingElse").is_none());
    }

    #[test]
    fn test_invoice_number_shape() {
        let purchase = Purchase::new(
            core_kernel::ProductId::new(),
            core_kernel::AccountId::new(),
            core_kernel::BuyerId::new(),
            domain_purchase::PurchaseKind::Single,
            Money::new(rust_decimal_macros::dec!(120), core_kernel::Currency::BRL),
            1,
        );

        let invoice = express_invoice_number(&purchase);
        assert!(invoice.starts_with('A'));
        assert!(invoice.contains("PU"));
    }
}
