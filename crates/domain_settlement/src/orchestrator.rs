//! The payment orchestrator
//!
//! Single front door for every mutation of the purchase ledger. Callers
//! never touch the store directly: the orchestrator validates, delegates
//! method-specific work to the processor registry, and funnels every
//! settlement through the store's atomic `commit_settlement`, which is what
//! makes the at-most-once side-effect guarantee hold under duplicate
//! gateway deliveries.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{AccountId, Money, PaymentId, ProductId, PurchaseId, Rate};
use domain_purchase::{
    Buyer, DiscountResolver, LedgerStore, Payment, PaymentMethod, PaymentStatus, Product,
    ProductCatalog, ProductCategory, Purchase, PurchaseError, PurchaseKind, PurchaseStatus,
    SettlementCommit, Transition, TransitionSource, Voucher, VoucherBatch,
};
use tracing::{info, instrument, warn};

use crate::error::SettlementError;
use crate::outcome::{OutcomeDispatcher, SettlementOutcome, VoucherGrant};
use crate::processor::{
    CreatePaymentRequest, NotificationPayload, PaymentInstructions, ProcessorRegistry,
};

/// Orchestrator-level policy knobs
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Global floor for variable-price amounts
    pub minimum_donation: Money,
}

/// Result of a notify/conclude round
#[derive(Debug, Clone)]
pub struct NotifyReceipt {
    pub purchase: Purchase,
    pub payment: Payment,
    /// Absent only when a conclusion found the payment already settled
    pub transition: Option<Transition>,
    /// Dispatched side effect, when this delivery produced one
    pub outcome: Option<SettlementOutcome>,
}

pub struct PaymentOrchestrator {
    store: Arc<dyn LedgerStore>,
    catalog: Arc<dyn ProductCatalog>,
    registry: ProcessorRegistry,
    dispatcher: Arc<dyn OutcomeDispatcher>,
    resolver: DiscountResolver,
    config: OrchestratorConfig,
}

/// Purchase variant implied by the product category
fn kind_for(category: ProductCategory) -> PurchaseKind {
    match category {
        ProductCategory::Corporate => PurchaseKind::SponsorSeat,
        ProductCategory::Donation => PurchaseKind::Donation,
        ProductCategory::Student => PurchaseKind::DiscountedSeat,
        ProductCategory::General | ProductCategory::Government => PurchaseKind::Single,
    }
}

impl PaymentOrchestrator {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        catalog: Arc<dyn ProductCatalog>,
        registry: ProcessorRegistry,
        dispatcher: Arc<dyn OutcomeDispatcher>,
        config: OrchestratorConfig,
    ) -> Self {
        let resolver = DiscountResolver::new(store.clone(), catalog.clone());
        Self {
            store,
            catalog,
            registry,
            dispatcher,
            resolver,
            config,
        }
    }

    /// Opens a purchase for a product
    ///
    /// Variable-price products read the unit price from `amount` and
    /// enforce the configured floor; fixed-price products ignore it.
    #[instrument(skip(self, buyer), fields(product_id = %product_id))]
    pub async fn create_purchase(
        &self,
        buyer: &Buyer,
        product_id: ProductId,
        customer_id: AccountId,
        quantity: u32,
        amount: Option<Money>,
    ) -> Result<Purchase, SettlementError> {
        let product = self.catalog.product(product_id).await?;

        if !product.on_sale(Utc::now()) {
            return Err(PurchaseError::SalesClosed.into());
        }
        if !product.check_eligibility(buyer) {
            return Err(PurchaseError::IneligibleBuyer.into());
        }
        // billing requires a legal document for every category
        if !buyer.has_document() {
            return Err(PurchaseError::DocumentNotDefined.into());
        }

        let unit_price = if product.variable_price {
            let given = amount.ok_or(PurchaseError::BelowMinimumAmount {
                given: "none".to_string(),
                minimum: self.variable_price_floor(&product).to_string(),
            })?;
            let floor = self.variable_price_floor(&product);
            if given.amount() < floor.amount() {
                return Err(PurchaseError::BelowMinimumAmount {
                    given: given.to_string(),
                    minimum: floor.to_string(),
                }
                .into());
            }
            given
        } else {
            product.price
        };

        let purchase = Purchase::new(
            product.id,
            customer_id,
            buyer.id,
            kind_for(product.category),
            unit_price,
            quantity,
        );
        self.store.insert_purchase(&purchase).await?;
        info!(purchase_id = %purchase.id, "purchase opened");

        Ok(purchase)
    }

    fn variable_price_floor(&self, product: &Product) -> Money {
        if product.minimum_amount.amount() > self.config.minimum_donation.amount() {
            product.minimum_amount
        } else {
            self.config.minimum_donation
        }
    }

    /// Opens a payment against a purchase and runs its outbound leg
    #[instrument(skip(self, request), fields(purchase_id = %purchase_id, %method))]
    pub async fn create_payment(
        &self,
        purchase_id: PurchaseId,
        method: PaymentMethod,
        request: &CreatePaymentRequest,
    ) -> Result<(PaymentInstructions, PaymentId), SettlementError> {
        let purchase = self.store.purchase(purchase_id).await?;
        if purchase.is_satisfied() {
            return Err(PurchaseError::AlreadySatisfied.into());
        }
        if purchase.status.is_terminal() {
            return Err(PurchaseError::PurchaseIsStale.into());
        }

        let product = self.catalog.product(purchase.product_id).await?;
        if !product.on_sale(Utc::now()) {
            return Err(PurchaseError::SalesClosed.into());
        }

        let payments = self.store.payments_of(purchase_id).await?;
        let outstanding = purchase.outstanding_amount(&payments);
        if !outstanding.is_positive() {
            return Err(PurchaseError::AlreadySatisfied.into());
        }

        // default amount is the outstanding balance; variable-price
        // products take it from the request instead
        let amount = if product.variable_price {
            let given = request.amount.unwrap_or(outstanding);
            let floor = self.variable_price_floor(&product);
            if given.amount() < floor.amount() {
                return Err(PurchaseError::BelowMinimumAmount {
                    given: given.to_string(),
                    minimum: floor.to_string(),
                }
                .into());
            }
            given
        } else {
            outstanding
        };

        let processor = self.registry.get(method)?;
        let mut payment = processor.create(&purchase, &product, amount, request).await?;
        self.store.insert_payment(&payment).await?;

        let instructions = processor.process(&mut payment, &purchase).await?;
        self.store.update_payment(&payment).await?;
        info!(payment_id = %payment.id, "payment opened");

        if processor.settles_on_creation() {
            let transition = Transition::new(
                payment.id,
                payment.status,
                PaymentStatus::Paid,
                TransitionSource::Manual,
                serde_json::json!({ "reason": "settled-on-creation" }),
            );
            self.apply_transition(&purchase, &product, payment.id, transition)
                .await?;
        }

        Ok((instructions, payment.id))
    }

    /// Applies a server-to-server settlement notification
    ///
    /// The gateway round trip (inside the processor) happens before the
    /// store lock; only `commit_settlement` is serialized.
    #[instrument(skip(self, payload), fields(purchase_id = %purchase_id, payment_id = %payment_id))]
    pub async fn notify(
        &self,
        purchase_id: PurchaseId,
        payment_id: PaymentId,
        payload: &NotificationPayload,
        source: TransitionSource,
    ) -> Result<NotifyReceipt, SettlementError> {
        let (purchase, product, payment) = self.load_pair(purchase_id, payment_id).await?;

        let processor = self.registry.get(payment.method)?;
        let transition = processor
            .notify(&purchase, &payment, payload, source)
            .await?;

        let (commit, outcome) = self
            .apply_transition(&purchase, &product, payment.id, transition)
            .await?;

        Ok(NotifyReceipt {
            purchase: commit.purchase,
            payment: commit.payment,
            transition: Some(commit.transition),
            outcome,
        })
    }

    /// Applies the user's synchronous return from a redirect gateway
    ///
    /// A webhook may already have settled the payment before the browser
    /// arrives; that is a no-op, not an error.
    #[instrument(skip(self, payload), fields(purchase_id = %purchase_id, payment_id = %payment_id))]
    pub async fn conclude(
        &self,
        purchase_id: PurchaseId,
        payment_id: PaymentId,
        payload: &NotificationPayload,
    ) -> Result<NotifyReceipt, SettlementError> {
        let (purchase, product, payment) = self.load_pair(purchase_id, payment_id).await?;

        if payment.status == PaymentStatus::Paid {
            info!(payment_id = %payment.id, "conclusion after settlement, nothing to do");
            return Ok(NotifyReceipt {
                purchase,
                payment,
                transition: None,
                outcome: None,
            });
        }

        let processor = self.registry.get(payment.method)?;
        let transition = processor.conclude(&purchase, &payment, payload).await?;

        let (commit, outcome) = self
            .apply_transition(&purchase, &product, payment.id, transition)
            .await?;

        Ok(NotifyReceipt {
            purchase: commit.purchase,
            payment: commit.payment,
            transition: Some(commit.transition),
            outcome,
        })
    }

    /// Finishes the manual-document gate: in-analysis becomes paid
    pub async fn document_analyzed(
        &self,
        purchase_id: PurchaseId,
    ) -> Result<Purchase, SettlementError> {
        let purchase = self
            .store
            .set_purchase_status(
                purchase_id,
                PurchaseStatus::DocumentInAnalysis,
                PurchaseStatus::Paid,
            )
            .await?;
        let product = self.catalog.product(purchase.product_id).await?;

        self.dispatcher
            .dispatch(&SettlementOutcome::DocumentApproved {
                purchase: purchase.clone(),
            })
            .await;
        self.dispatcher
            .dispatch(&SettlementOutcome::PurchaseSettled {
                purchase: purchase.clone(),
                issue_vouchers: Self::grant_for(&purchase, &product),
            })
            .await;

        Ok(purchase)
    }

    /// Time-based stale policy: past the sales deadline with nothing paid
    ///
    /// Returns the updated purchase when the policy fired, `None` when the
    /// purchase was not eligible.
    pub async fn mark_stale(
        &self,
        purchase_id: PurchaseId,
        now: DateTime<Utc>,
    ) -> Result<Option<Purchase>, SettlementError> {
        let purchase = self.store.purchase(purchase_id).await?;
        let product = self.catalog.product(purchase.product_id).await?;
        let payments = self.store.payments_of(purchase_id).await?;

        if !purchase.could_be_stale(&product, &payments, now) {
            return Ok(None);
        }

        let stale = self
            .store
            .set_purchase_status(purchase_id, PurchaseStatus::Pending, PurchaseStatus::Stale)
            .await?;
        warn!(purchase_id = %stale.id, "purchase marked stale");
        Ok(Some(stale))
    }

    /// Discount-resolver passthrough for pre-purchase voucher checks
    pub async fn check_voucher(
        &self,
        hash_code: &str,
        buyer: &Buyer,
        today: NaiveDate,
    ) -> Result<Option<Voucher>, SettlementError> {
        Ok(self.resolver.check(hash_code, buyer, today).await?)
    }

    /// Issues a voucher batch, typically to honor a `VoucherGrant`
    pub async fn issue_vouchers(
        &self,
        batch: &VoucherBatch,
        quantity: u32,
        creator: AccountId,
    ) -> Result<Vec<Voucher>, SettlementError> {
        let vouchers = batch.issue(quantity, creator);
        self.store.insert_vouchers(&vouchers).await?;
        Ok(vouchers)
    }

    async fn load_pair(
        &self,
        purchase_id: PurchaseId,
        payment_id: PaymentId,
    ) -> Result<(Purchase, Product, Payment), SettlementError> {
        let purchase = self.store.purchase(purchase_id).await?;
        if purchase.is_stale() {
            return Err(PurchaseError::PurchaseIsStale.into());
        }
        let product = self.catalog.product(purchase.product_id).await?;
        let payment = self.store.payment(purchase_id, payment_id).await?;
        Ok((purchase, product, payment))
    }

    /// Commits a transition atomically and dispatches at most one outcome
    async fn apply_transition(
        &self,
        purchase: &Purchase,
        product: &Product,
        payment_id: PaymentId,
        transition: Transition,
    ) -> Result<(SettlementCommit, Option<SettlementOutcome>), SettlementError> {
        let commit = self
            .store
            .commit_settlement(
                purchase.id,
                payment_id,
                transition,
                product.category.requires_document_review(),
            )
            .await?;

        let outcome = if commit.newly_satisfied {
            Some(SettlementOutcome::PurchaseSettled {
                purchase: commit.purchase.clone(),
                issue_vouchers: Self::grant_for(&commit.purchase, product),
            })
        } else if commit.previous_purchase_status != PurchaseStatus::DocumentInAnalysis
            && commit.purchase.status == PurchaseStatus::DocumentInAnalysis
        {
            Some(SettlementOutcome::DocumentReceived {
                purchase: commit.purchase.clone(),
            })
        } else {
            None
        };

        if let Some(outcome) = &outcome {
            self.dispatcher.dispatch(outcome).await;
        }

        Ok((commit, outcome))
    }

    /// Sponsor purchases settle with one full-discount voucher per unit
    fn grant_for(purchase: &Purchase, product: &Product) -> Option<VoucherGrant> {
        if product.category.grants_vouchers() || purchase.kind == PurchaseKind::SponsorSeat {
            Some(VoucherGrant {
                product_id: product.id,
                quantity: purchase.quantity,
                discount: Rate::full(),
            })
        } else {
            None
        }
    }
}
