//! Settlement outcome events
//!
//! Instead of calling mailers or renderers directly, settlement produces an
//! outcome value that the host application consumes through the
//! `OutcomeDispatcher` trait. The orchestrator guarantees that
//! `PurchaseSettled` is dispatched at most once per purchase, no matter how
//! many duplicate notifications arrive.

use async_trait::async_trait;
use core_kernel::{ProductId, Rate};
use domain_purchase::Purchase;
use tracing::info;

/// Instruction to issue seat vouchers as a consequence of a settlement
///
/// Sponsor purchases grant one full-discount seat voucher per unit bought.
#[derive(Debug, Clone)]
pub struct VoucherGrant {
    /// Product the vouchers will apply to
    pub product_id: ProductId,
    /// How many vouchers to issue
    pub quantity: u32,
    /// Discount each voucher carries
    pub discount: Rate,
}

/// What a settlement event means to the rest of the system
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    /// The purchase just became fully paid
    PurchaseSettled {
        purchase: Purchase,
        /// Present for sponsor purchases; the consumer issues the vouchers
        issue_vouchers: Option<VoucherGrant>,
    },
    /// A fully-paid document-gated purchase is now waiting for manual review
    DocumentReceived { purchase: Purchase },
    /// Manual review approved the document
    DocumentApproved { purchase: Purchase },
}

/// Consumer of settlement outcomes
///
/// Implementations are fire-and-forget; a failing consumer must not undo
/// the settlement that produced the outcome.
#[async_trait]
pub trait OutcomeDispatcher: Send + Sync {
    async fn dispatch(&self, outcome: &SettlementOutcome);
}

/// Default dispatcher that only records outcomes in the log stream
pub struct LoggingDispatcher;

#[async_trait]
impl OutcomeDispatcher for LoggingDispatcher {
    async fn dispatch(&self, outcome: &SettlementOutcome) {
        match outcome {
            SettlementOutcome::PurchaseSettled {
                purchase,
                issue_vouchers,
            } => {
                info!(
                    purchase_id = %purchase.id,
                    grants_vouchers = issue_vouchers.is_some(),
                    "purchase settled"
                );
            }
            SettlementOutcome::DocumentReceived { purchase } => {
                info!(purchase_id = %purchase.id, "document review requested");
            }
            SettlementOutcome::DocumentApproved { purchase } => {
                info!(purchase_id = %purchase.id, "document approved");
            }
        }
    }
}
