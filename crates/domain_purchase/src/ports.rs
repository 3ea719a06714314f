//! Ledger persistence port
//!
//! The `LedgerStore` trait is the only gateway to the shared
//! purchase/payment/transition/voucher state. Adapters implement it over
//! PostgreSQL (infra_db) or in memory (test_utils); the orchestrator and
//! resolver depend solely on this trait.
//!
//! The critical operation is [`LedgerStore::commit_settlement`]: it must
//! apply a transition and recalculate both statuses as one atomic
//! read-modify-write on the payment row, so that of N duplicate deliveries
//! only one commit observes the purchase flipping to paid.

use async_trait::async_trait;
use core_kernel::{PaymentId, ProductId, PurchaseId, VoucherId};
use thiserror::Error;

use crate::payment::Payment;
use crate::product::Product;
use crate::purchase::{Purchase, PurchaseStatus};
use crate::transition::Transition;
use crate::voucher::Voucher;

/// Error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity was not found
    #[error("Not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// The operation conflicts with existing data (e.g., a compare-and-set
    /// that lost the race)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Connection to the underlying system failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A stored value could not be decoded
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        StoreError::Conflict(message.into())
    }
}

/// Result of atomically committing a settlement transition
#[derive(Debug, Clone)]
pub struct SettlementCommit {
    /// Purchase status observed inside the critical section, before
    /// recalculation
    pub previous_purchase_status: PurchaseStatus,
    /// The purchase after recalculation
    pub purchase: Purchase,
    /// The payment after recalculation
    pub payment: Payment,
    /// The transition as persisted
    pub transition: Transition,
    /// True only for the single commit that flipped the purchase to paid
    pub newly_satisfied: bool,
}

/// Persistence port for the purchase ledger
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Loads a purchase
    async fn purchase(&self, id: PurchaseId) -> Result<Purchase, StoreError>;

    /// Inserts a new purchase
    async fn insert_purchase(&self, purchase: &Purchase) -> Result<(), StoreError>;

    /// Loads one payment, scoped by its owning purchase
    async fn payment(
        &self,
        purchase_id: PurchaseId,
        payment_id: PaymentId,
    ) -> Result<Payment, StoreError>;

    /// Loads all payments of a purchase
    async fn payments_of(&self, purchase_id: PurchaseId) -> Result<Vec<Payment>, StoreError>;

    /// Inserts a new payment
    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError>;

    /// Persists method-specific fields set during processing
    /// (gateway codes, tokens)
    async fn update_payment(&self, payment: &Payment) -> Result<(), StoreError>;

    /// Next value of the gateway-facing payment sequence
    async fn next_payment_sequence(&self) -> Result<u64, StoreError>;

    /// Loads the transition history of a payment, ordered by creation time
    /// then insertion order
    async fn transitions_of(&self, payment_id: PaymentId) -> Result<Vec<Transition>, StoreError>;

    /// Atomically appends a transition and recalculates payment and
    /// purchase status
    ///
    /// Implementations must serialize this per payment (row lock or
    /// equivalent) and compute `newly_satisfied` from the purchase status
    /// observed inside that critical section, so duplicate deliveries can
    /// never both report it.
    async fn commit_settlement(
        &self,
        purchase_id: PurchaseId,
        payment_id: PaymentId,
        transition: Transition,
        requires_document_review: bool,
    ) -> Result<SettlementCommit, StoreError>;

    /// Compare-and-sets a purchase status; fails with `Conflict` if the
    /// current status is not `expected`
    async fn set_purchase_status(
        &self,
        id: PurchaseId,
        expected: PurchaseStatus,
        next: PurchaseStatus,
    ) -> Result<Purchase, StoreError>;

    /// Finds a bank-slip payment by its bank-facing reference number
    async fn payment_by_slip_number(
        &self,
        our_number: &str,
    ) -> Result<Option<Payment>, StoreError>;

    /// Loads all vouchers sharing a hash code
    async fn vouchers_by_hash(&self, hash_code: &str) -> Result<Vec<Voucher>, StoreError>;

    /// Inserts a batch of vouchers
    async fn insert_vouchers(&self, vouchers: &[Voucher]) -> Result<(), StoreError>;

    /// Marks a voucher consumed by a payment; fails with `Conflict` if it
    /// was already consumed (single-use compare-and-set)
    async fn consume_voucher(
        &self,
        voucher_id: VoucherId,
        payment_id: PaymentId,
    ) -> Result<(), StoreError>;
}

/// Read-only access to the product catalog collaborator
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Loads the ledger-relevant slice of a product
    async fn product(&self, id: ProductId) -> Result<Product, StoreError>;
}
