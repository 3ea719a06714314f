//! The polymorphic payment-processor contract
//!
//! Every settlement method implements `PaymentProcessor`. The orchestrator
//! never inspects method-specific payloads itself: it resolves the processor
//! for the payment's method and delegates creation, gateway processing, and
//! payload interpretation to it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use core_kernel::{Money, Rate};
use domain_purchase::{
    Buyer, Payment, PaymentMethod, Product, Purchase, PurchaseError, Transition, TransitionSource,
};
use serde::Serialize;

use crate::error::SettlementError;

/// Raw key/value settlement payload, as decoded from a form body or
/// query string
pub type NotificationPayload = HashMap<String, String>;

/// Serializes a payload for transition audit storage
pub fn payload_json(payload: &NotificationPayload) -> serde_json::Value {
    serde_json::to_value(payload).unwrap_or(serde_json::Value::Null)
}

/// Caller-supplied data for opening a payment
#[derive(Debug, Clone, Default)]
pub struct CreatePaymentRequest {
    /// Chosen amount, read only for variable-price products
    pub amount: Option<Money>,
    /// Voucher hash code, required by the voucher method
    pub hash_code: Option<String>,
    /// Purchaser context, required where eligibility rules apply
    pub buyer: Option<Buyer>,
}

/// What the caller should do next to complete the payment
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PaymentInstructions {
    /// Send the user to the gateway's checkout page
    Redirect { url: String },
    /// Print and pay the bank slip
    BankSlip {
        our_number: String,
        document_hash: String,
        due_date: NaiveDate,
        amount: Money,
    },
    /// Pay the operator in person
    Attended { description: String },
    /// Nothing to do; the voucher settled the payment immediately
    VoucherApplied { discount: Rate, amount: Money },
}

/// Per-method settlement behavior
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// The method this processor handles
    fn method(&self) -> PaymentMethod;

    /// True for methods that settle at creation time, with no
    /// asynchronous notify phase
    fn settles_on_creation(&self) -> bool {
        false
    }

    /// Builds the method-specific payment record
    ///
    /// `amount` is the orchestrator's default (the outstanding balance, or
    /// the validated request amount for variable-price products); a
    /// processor may override it, as the voucher method does.
    async fn create(
        &self,
        purchase: &Purchase,
        product: &Product,
        amount: Money,
        request: &CreatePaymentRequest,
    ) -> Result<Payment, SettlementError>;

    /// Performs the outbound leg of the payment and returns instructions
    ///
    /// May mutate the payment's details (checkout codes, tokens); the
    /// orchestrator persists the mutation afterwards. Transport failures
    /// must surface as `ExternalService`, never as raw errors.
    async fn process(
        &self,
        payment: &mut Payment,
        purchase: &Purchase,
    ) -> Result<PaymentInstructions, SettlementError>;

    /// Interprets a settlement payload into a transition
    ///
    /// Must be defensive: a payload whose correlation identifiers do not
    /// match the payment fails with `InvalidNotification` rather than being
    /// trusted.
    async fn notify(
        &self,
        purchase: &Purchase,
        payment: &Payment,
        payload: &NotificationPayload,
        source: TransitionSource,
    ) -> Result<Transition, SettlementError>;

    /// Interprets the synchronous redirect-return payload
    async fn conclude(
        &self,
        purchase: &Purchase,
        payment: &Payment,
        payload: &NotificationPayload,
    ) -> Result<Transition, SettlementError> {
        self.notify(purchase, payment, payload, TransitionSource::Conclusion)
            .await
    }
}

/// Maps payment methods to their processors
///
/// Built once at startup and handed to the orchestrator; an unknown method
/// resolves to `UnsupportedMethod`.
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: HashMap<PaymentMethod, Arc<dyn PaymentProcessor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a processor under its own method
    pub fn register(mut self, processor: Arc<dyn PaymentProcessor>) -> Self {
        self.processors.insert(processor.method(), processor);
        self
    }

    /// Resolves the processor for a method
    pub fn get(&self, method: PaymentMethod) -> Result<Arc<dyn PaymentProcessor>, SettlementError> {
        self.processors.get(&method).cloned().ok_or_else(|| {
            SettlementError::Purchase(PurchaseError::UnsupportedMethod(method.to_string()))
        })
    }

    /// Methods with a registered processor
    pub fn methods(&self) -> Vec<PaymentMethod> {
        self.processors.keys().copied().collect()
    }
}
