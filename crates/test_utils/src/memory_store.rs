//! In-memory ledger adapters
//!
//! `MemoryLedgerStore` implements the full `LedgerStore` port over hash maps
//! behind one async lock, which is what serializes `commit_settlement` and
//! keeps the at-most-once settlement semantics testable without a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use core_kernel::{PaymentId, ProductId, PurchaseId, VoucherId};
use domain_purchase::{
    LedgerStore, Payment, PaymentDetails, Product, ProductCatalog, Purchase,
    PurchaseStatus, SettlementCommit, StoreError, Transition, Voucher,
};
use tokio::sync::RwLock;

#[derive(Default)]
struct Ledger {
    purchases: HashMap<PurchaseId, Purchase>,
    payments: HashMap<PaymentId, Payment>,
    transitions: Vec<Transition>,
    vouchers: Vec<Voucher>,
}

/// Hash-map-backed `LedgerStore`
#[derive(Default)]
pub struct MemoryLedgerStore {
    ledger: RwLock<Ledger>,
    sequence: AtomicU64,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of stored transitions, for duplicate-delivery assertions
    pub async fn transition_count(&self) -> usize {
        self.ledger.read().await.transitions.len()
    }

    /// Direct voucher lookup, for single-use assertions
    pub async fn voucher(&self, id: VoucherId) -> Option<Voucher> {
        self.ledger
            .read()
            .await
            .vouchers
            .iter()
            .find(|v| v.id == id)
            .cloned()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn purchase(&self, id: PurchaseId) -> Result<Purchase, StoreError> {
        self.ledger
            .read()
            .await
            .purchases
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("purchase", id))
    }

    async fn insert_purchase(&self, purchase: &Purchase) -> Result<(), StoreError> {
        self.ledger
            .write()
            .await
            .purchases
            .insert(purchase.id, purchase.clone());
        Ok(())
    }

    async fn payment(
        &self,
        purchase_id: PurchaseId,
        payment_id: PaymentId,
    ) -> Result<Payment, StoreError> {
        self.ledger
            .read()
            .await
            .payments
            .get(&payment_id)
            .filter(|p| p.purchase_id == purchase_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("payment", payment_id))
    }

    async fn payments_of(&self, purchase_id: PurchaseId) -> Result<Vec<Payment>, StoreError> {
        let ledger = self.ledger.read().await;
        let mut payments: Vec<Payment> = ledger
            .payments
            .values()
            .filter(|p| p.purchase_id == purchase_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        self.ledger
            .write()
            .await
            .payments
            .insert(payment.id, payment.clone());
        Ok(())
    }

    async fn update_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        let mut ledger = self.ledger.write().await;
        match ledger.payments.get_mut(&payment.id) {
            Some(stored) => {
                *stored = payment.clone();
                Ok(())
            }
            None => Err(StoreError::not_found("payment", payment.id)),
        }
    }

    async fn next_payment_sequence(&self) -> Result<u64, StoreError> {
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn transitions_of(&self, payment_id: PaymentId) -> Result<Vec<Transition>, StoreError> {
        Ok(self
            .ledger
            .read()
            .await
            .transitions
            .iter()
            .filter(|t| t.payment_id == payment_id)
            .cloned()
            .collect())
    }

    async fn commit_settlement(
        &self,
        purchase_id: PurchaseId,
        payment_id: PaymentId,
        transition: Transition,
        requires_document_review: bool,
    ) -> Result<SettlementCommit, StoreError> {
        // single write lock is the whole critical section
        let mut ledger = self.ledger.write().await;

        let previous_purchase_status = ledger
            .purchases
            .get(&purchase_id)
            .map(|p| p.status)
            .ok_or_else(|| StoreError::not_found("purchase", purchase_id))?;
        if !ledger
            .payments
            .get(&payment_id)
            .is_some_and(|p| p.purchase_id == purchase_id)
        {
            return Err(StoreError::not_found("payment", payment_id));
        }

        ledger.transitions.push(transition.clone());

        let payment_status = {
            let payment = &ledger.payments[&payment_id];
            let transitions: Vec<Transition> = ledger
                .transitions
                .iter()
                .filter(|t| t.payment_id == payment_id)
                .cloned()
                .collect();
            payment.recalculated_status(&transitions)
        };
        if let Some(payment) = ledger.payments.get_mut(&payment_id) {
            payment.status = payment_status;
        }

        let purchase_status = {
            let purchase = &ledger.purchases[&purchase_id];
            let payments: Vec<Payment> = ledger
                .payments
                .values()
                .filter(|p| p.purchase_id == purchase_id)
                .cloned()
                .collect();
            purchase.recalculated_status(&payments, requires_document_review)
        };
        let purchase = {
            let stored = ledger
                .purchases
                .get_mut(&purchase_id)
                .ok_or_else(|| StoreError::not_found("purchase", purchase_id))?;
            stored.status = purchase_status;
            stored.updated_at = Utc::now();
            stored.clone()
        };
        let payment = ledger.payments[&payment_id].clone();

        Ok(SettlementCommit {
            previous_purchase_status,
            newly_satisfied: previous_purchase_status != PurchaseStatus::Paid
                && purchase.status == PurchaseStatus::Paid,
            purchase,
            payment,
            transition,
        })
    }

    async fn set_purchase_status(
        &self,
        id: PurchaseId,
        expected: PurchaseStatus,
        next: PurchaseStatus,
    ) -> Result<Purchase, StoreError> {
        let mut ledger = self.ledger.write().await;
        let purchase = ledger
            .purchases
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("purchase", id))?;
        if purchase.status != expected {
            return Err(StoreError::conflict(format!(
                "purchase {id} is {:?}, expected {expected:?}",
                purchase.status
            )));
        }
        purchase.status = next;
        purchase.updated_at = Utc::now();
        Ok(purchase.clone())
    }

    async fn payment_by_slip_number(
        &self,
        our_number: &str,
    ) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .ledger
            .read()
            .await
            .payments
            .values()
            .find(|p| {
                matches!(
                    &p.details,
                    PaymentDetails::BankSlip { our_number: n, .. } if n == our_number
                )
            })
            .cloned())
    }

    async fn vouchers_by_hash(&self, hash_code: &str) -> Result<Vec<Voucher>, StoreError> {
        Ok(self
            .ledger
            .read()
            .await
            .vouchers
            .iter()
            .filter(|v| v.hash_code == hash_code)
            .cloned()
            .collect())
    }

    async fn insert_vouchers(&self, vouchers: &[Voucher]) -> Result<(), StoreError> {
        self.ledger
            .write()
            .await
            .vouchers
            .extend(vouchers.iter().cloned());
        Ok(())
    }

    async fn consume_voucher(
        &self,
        voucher_id: VoucherId,
        payment_id: PaymentId,
    ) -> Result<(), StoreError> {
        let mut ledger = self.ledger.write().await;
        let voucher = ledger
            .vouchers
            .iter_mut()
            .find(|v| v.id == voucher_id)
            .ok_or_else(|| StoreError::not_found("voucher", voucher_id))?;
        if voucher.consumed_by.is_some() {
            return Err(StoreError::conflict(format!(
                "voucher {voucher_id} already consumed"
            )));
        }
        voucher.consumed_by = Some(payment_id);
        Ok(())
    }
}

/// Hash-map-backed `ProductCatalog`
#[derive(Default)]
pub struct MemoryProductCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl MemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, product: Product) {
        self.products.write().await.insert(product.id, product);
    }
}

#[async_trait]
impl ProductCatalog for MemoryProductCatalog {
    async fn product(&self, id: ProductId) -> Result<Product, StoreError> {
        self.products
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("product", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{TestPaymentBuilder, TestProductBuilder, TestPurchaseBuilder};
    use domain_purchase::{PaymentStatus, Transition, TransitionSource};

    #[tokio::test]
    async fn test_commit_settlement_reports_newly_satisfied_once() {
        let store = MemoryLedgerStore::new();
        let product = TestProductBuilder::new().build();
        let purchase = TestPurchaseBuilder::new().for_product(&product).build();
        let payment = TestPaymentBuilder::new().for_purchase(&purchase).build();
        store.insert_purchase(&purchase).await.unwrap();
        store.insert_payment(&payment).await.unwrap();

        let settle = |old| {
            Transition::new(
                payment.id,
                old,
                PaymentStatus::Paid,
                TransitionSource::Notification,
                serde_json::json!({}),
            )
        };

        let first = store
            .commit_settlement(purchase.id, payment.id, settle(PaymentStatus::Pending), false)
            .await
            .unwrap();
        assert!(first.newly_satisfied);

        let second = store
            .commit_settlement(purchase.id, payment.id, settle(PaymentStatus::Paid), false)
            .await
            .unwrap();
        assert!(!second.newly_satisfied);
        assert_eq!(store.transition_count().await, 2);
    }

    #[tokio::test]
    async fn test_set_purchase_status_is_compare_and_set() {
        let store = MemoryLedgerStore::new();
        let purchase = TestPurchaseBuilder::new().build();
        store.insert_purchase(&purchase).await.unwrap();

        let updated = store
            .set_purchase_status(purchase.id, PurchaseStatus::Pending, PurchaseStatus::Stale)
            .await
            .unwrap();
        assert_eq!(updated.status, PurchaseStatus::Stale);

        let conflict = store
            .set_purchase_status(purchase.id, PurchaseStatus::Pending, PurchaseStatus::Stale)
            .await;
        assert!(matches!(conflict, Err(StoreError::Conflict(_))));
    }
}
