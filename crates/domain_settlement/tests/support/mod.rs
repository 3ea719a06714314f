//! Shared wiring for the settlement test suite: mock gateways, an
//! outcome-collecting dispatcher, and a fully assembled orchestrator over
//! the in-memory store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use core_kernel::{Currency, Money};
use domain_settlement::{
    BankSlipProcessor, CashProcessor, CheckoutGatewayApi, CheckoutSession, CheckoutStatus,
    CheckoutTransaction, ExpressCapture, ExpressCheckoutProcessor, ExpressCheckoutSetup,
    ExpressDetails, ExpressGatewayApi, ExpressStatus, GatewayError, OrchestratorConfig,
    OutcomeDispatcher, PaymentOrchestrator, ProcessorRegistry, SettlementOutcome, SlipConfig,
    VoucherProcessor, WebCheckoutProcessor,
};
use rust_decimal_macros::dec;
use test_utils::{MemoryLedgerStore, MemoryProductCatalog};

/// Dispatcher that records every outcome for assertions
#[derive(Default)]
pub struct CollectingDispatcher {
    outcomes: Mutex<Vec<SettlementOutcome>>,
}

impl CollectingDispatcher {
    pub fn outcomes(&self) -> Vec<SettlementOutcome> {
        self.outcomes.lock().unwrap().clone()
    }

    pub fn settled_count(&self) -> usize {
        self.outcomes()
            .iter()
            .filter(|o| matches!(o, SettlementOutcome::PurchaseSettled { .. }))
            .count()
    }
}

#[async_trait]
impl OutcomeDispatcher for CollectingDispatcher {
    async fn dispatch(&self, outcome: &SettlementOutcome) {
        self.outcomes.lock().unwrap().push(outcome.clone());
    }
}

/// Scriptable web-checkout gateway
pub struct MockCheckoutGateway {
    /// Reference captured when the session was opened
    captured_reference: Mutex<Option<String>>,
    /// Status every lookup reports
    pub status: Mutex<CheckoutStatus>,
    /// When set, lookups report this reference instead of the captured one
    pub override_reference: Mutex<Option<String>>,
}

impl Default for MockCheckoutGateway {
    fn default() -> Self {
        Self {
            captured_reference: Mutex::new(None),
            status: Mutex::new(CheckoutStatus::Paid),
            override_reference: Mutex::new(None),
        }
    }
}

impl MockCheckoutGateway {
    fn reported_reference(&self) -> String {
        self.override_reference
            .lock()
            .unwrap()
            .clone()
            .or_else(|| self.captured_reference.lock().unwrap().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CheckoutGatewayApi for MockCheckoutGateway {
    async fn create_session(
        &self,
        reference: &str,
        _amount: &Money,
        _description: &str,
    ) -> Result<CheckoutSession, GatewayError> {
        *self.captured_reference.lock().unwrap() = Some(reference.to_string());
        Ok(CheckoutSession {
            code: "SESS-1".to_string(),
            redirect_url: "https://gateway.test/checkout/SESS-1".to_string(),
        })
    }

    async fn lookup_notification(&self, _code: &str) -> Result<CheckoutTransaction, GatewayError> {
        Ok(CheckoutTransaction {
            reference: self.reported_reference(),
            status: *self.status.lock().unwrap(),
            gross_amount: None,
        })
    }

    async fn lookup_transaction(&self, code: &str) -> Result<CheckoutTransaction, GatewayError> {
        self.lookup_notification(code).await
    }
}

/// Scriptable express gateway
pub struct MockExpressGateway {
    /// Status `checkout_details` reports
    pub details_status: Mutex<ExpressStatus>,
    /// Whether the capture call was made
    pub captured: AtomicBool,
}

impl Default for MockExpressGateway {
    fn default() -> Self {
        Self {
            details_status: Mutex::new(ExpressStatus::Completed),
            captured: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ExpressGatewayApi for MockExpressGateway {
    async fn set_checkout(
        &self,
        _invoice_number: &str,
        _amount: &Money,
        _description: &str,
    ) -> Result<ExpressCheckoutSetup, GatewayError> {
        Ok(ExpressCheckoutSetup {
            token: "TOK-1".to_string(),
            redirect_url: "https://express.test/approve/TOK-1".to_string(),
        })
    }

    async fn checkout_details(&self, token: &str) -> Result<ExpressDetails, GatewayError> {
        Ok(ExpressDetails {
            token: token.to_string(),
            invoice_number: None,
            payer_id: None,
            status: *self.details_status.lock().unwrap(),
            correlation_id: Some("CORR-1".to_string()),
        })
    }

    async fn do_checkout(
        &self,
        _token: &str,
        _payer_id: &str,
        _amount: &Money,
    ) -> Result<ExpressCapture, GatewayError> {
        self.captured.store(true, Ordering::SeqCst);
        Ok(ExpressCapture {
            status: ExpressStatus::Completed,
            transaction_id: Some("TX-1".to_string()),
        })
    }
}

pub struct Harness {
    pub store: Arc<MemoryLedgerStore>,
    pub catalog: Arc<MemoryProductCatalog>,
    pub checkout: Arc<MockCheckoutGateway>,
    pub express: Arc<MockExpressGateway>,
    pub dispatcher: Arc<CollectingDispatcher>,
    pub orchestrator: Arc<PaymentOrchestrator>,
}

/// Wires every processor over in-memory adapters
pub fn harness() -> Harness {
    let store = Arc::new(MemoryLedgerStore::new());
    let catalog = Arc::new(MemoryProductCatalog::new());
    let checkout = Arc::new(MockCheckoutGateway::default());
    let express = Arc::new(MockExpressGateway::default());
    let dispatcher = Arc::new(CollectingDispatcher::default());

    let registry = ProcessorRegistry::new()
        .register(Arc::new(CashProcessor))
        .register(Arc::new(BankSlipProcessor::new(
            store.clone(),
            SlipConfig::default(),
        )))
        .register(Arc::new(WebCheckoutProcessor::new(
            store.clone(),
            checkout.clone(),
        )))
        .register(Arc::new(ExpressCheckoutProcessor::new(
            store.clone(),
            express.clone(),
        )))
        .register(Arc::new(VoucherProcessor::new(
            store.clone(),
            catalog.clone(),
        )));

    let orchestrator = Arc::new(PaymentOrchestrator::new(
        store.clone(),
        catalog.clone(),
        registry,
        dispatcher.clone(),
        OrchestratorConfig {
            minimum_donation: Money::new(dec!(10.00), Currency::BRL),
        },
    ));

    Harness {
        store,
        catalog,
        checkout,
        express,
        dispatcher,
        orchestrator,
    }
}
