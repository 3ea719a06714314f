//! Settlement Domain
//!
//! Everything that moves a payment toward `paid` lives here: the
//! `PaymentOrchestrator` front door, one `PaymentProcessor` per settlement
//! method, the gateway client traits (with reqwest-backed implementations),
//! and the bank-slip batch reconciler.
//!
//! The orchestrator owns the exactly-once settlement discipline: gateway
//! round trips run before any lock, and the only serialized step is the
//! store's `commit_settlement`, whose `newly_satisfied` flag decides — once
//! per purchase, ever — whether settlement side effects fire.

pub mod bank_slip;
pub mod cash;
pub mod error;
pub mod express_checkout;
pub mod gateway;
pub mod orchestrator;
pub mod outcome;
pub mod processor;
pub mod reconciler;
pub mod voucher_redeem;
pub mod web_checkout;

pub use bank_slip::{BankSlipProcessor, SlipConfig};
pub use cash::CashProcessor;
pub use error::SettlementError;
pub use express_checkout::{
    ExpressCapture, ExpressCheckoutProcessor, ExpressCheckoutSetup, ExpressDetails,
    ExpressGatewayApi, ExpressStatus, HttpExpressGateway,
};
pub use gateway::{GatewayConfig, GatewayError};
pub use orchestrator::{NotifyReceipt, OrchestratorConfig, PaymentOrchestrator};
pub use outcome::{LoggingDispatcher, OutcomeDispatcher, SettlementOutcome, VoucherGrant};
pub use processor::{
    CreatePaymentRequest, NotificationPayload, PaymentInstructions, PaymentProcessor,
    ProcessorRegistry,
};
pub use reconciler::{BatchSummary, RecordClass, RecordResult, SlipBatchReconciler};
pub use voucher_redeem::VoucherProcessor;
pub use web_checkout::{
    CheckoutGatewayApi, CheckoutSession, CheckoutStatus, CheckoutTransaction,
    HttpCheckoutGateway, WebCheckoutProcessor,
};
