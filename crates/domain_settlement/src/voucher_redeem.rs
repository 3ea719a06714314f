//! Voucher settlement
//!
//! Redeeming a voucher is not a monetary settlement: the voucher is
//! validated and selected at creation, its single use is claimed with a
//! compare-and-set during processing, and the payment settles immediately
//! for `discount × total_owed`. There is no asynchronous notify phase.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use core_kernel::Money;
use domain_purchase::{
    DiscountResolver, LedgerStore, Payment, PaymentDetails, PaymentMethod, Product, ProductCatalog,
    Purchase, PurchaseError, StoreError, Transition, TransitionSource,
};
use tracing::info;

use crate::error::SettlementError;
use crate::processor::{
    CreatePaymentRequest, NotificationPayload, PaymentInstructions, PaymentProcessor,
};

pub struct VoucherProcessor {
    store: Arc<dyn LedgerStore>,
    resolver: DiscountResolver,
}

impl VoucherProcessor {
    pub fn new(store: Arc<dyn LedgerStore>, catalog: Arc<dyn ProductCatalog>) -> Self {
        let resolver = DiscountResolver::new(store.clone(), catalog);
        Self { store, resolver }
    }
}

#[async_trait]
impl PaymentProcessor for VoucherProcessor {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Voucher
    }

    fn settles_on_creation(&self) -> bool {
        true
    }

    async fn create(
        &self,
        purchase: &Purchase,
        _product: &Product,
        _amount: Money,
        request: &CreatePaymentRequest,
    ) -> Result<Payment, SettlementError> {
        let hash_code = request.hash_code.as_deref().ok_or_else(|| {
            SettlementError::Purchase(PurchaseError::InvalidHashCode("<missing>".to_string()))
        })?;
        let buyer = request.buyer.as_ref().ok_or_else(|| {
            SettlementError::invalid_notification("voucher redemption requires buyer context")
        })?;

        let voucher = match self
            .resolver
            .check(hash_code, buyer, Utc::now().date_naive())
            .await?
        {
            Some(voucher) => voucher,
            None if self.resolver.is_exhausted(hash_code).await? => {
                return Err(SettlementError::Purchase(PurchaseError::VoucherAlreadyUsed(
                    hash_code.to_string(),
                )))
            }
            None => {
                return Err(SettlementError::Purchase(PurchaseError::InvalidHashCode(
                    hash_code.to_string(),
                )))
            }
        };

        // fixed at creation; never recomputed against a later price
        let amount = voucher.discount.apply(&purchase.total_owed());
        let details = PaymentDetails::Voucher {
            voucher_id: voucher.id,
            hash_code: voucher.hash_code.clone(),
            discount: voucher.discount,
        };

        Ok(
            Payment::new(purchase.id, PaymentMethod::Voucher, amount, details)
                .with_description(voucher.description),
        )
    }

    async fn process(
        &self,
        payment: &mut Payment,
        _purchase: &Purchase,
    ) -> Result<PaymentInstructions, SettlementError> {
        let (voucher_id, hash_code, discount) = match &payment.details {
            PaymentDetails::Voucher {
                voucher_id,
                hash_code,
                discount,
            } => (*voucher_id, hash_code.clone(), *discount),
            _ => {
                return Err(SettlementError::invalid_notification(
                    "payment does not carry voucher details",
                ))
            }
        };

        // single-use claim; losing the race means a sibling got here first
        match self.store.consume_voucher(voucher_id, payment.id).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                return Err(SettlementError::Purchase(PurchaseError::VoucherAlreadyUsed(
                    hash_code,
                )))
            }
            Err(err) => return Err(err.into()),
        }
        info!(payment_id = %payment.id, %voucher_id, "voucher consumed");

        Ok(PaymentInstructions::VoucherApplied {
            discount,
            amount: payment.amount,
        })
    }

    async fn notify(
        &self,
        _purchase: &Purchase,
        _payment: &Payment,
        _payload: &NotificationPayload,
        _source: TransitionSource,
    ) -> Result<Transition, SettlementError> {
        Err(SettlementError::invalid_notification(
            "voucher payments have no notification phase",
        ))
    }
}
