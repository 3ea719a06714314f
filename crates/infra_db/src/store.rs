//! SQLx-backed ledger store
//!
//! `PgLedgerStore` implements the domain's [`LedgerStore`] port over
//! PostgreSQL. Statuses are stored denormalized on the purchase and payment
//! rows for querying, but remain derived data: `commit_settlement` appends
//! the transition and recomputes both statuses inside one transaction, with
//! the purchase and payment rows locked `FOR UPDATE` so duplicate
//! notification deliveries serialize and only one commit observes the
//! purchase flipping to paid.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{
    AccountId, BuyerId, Currency, Money, PaymentId, ProductId, PurchaseId, TransitionId, VoucherId,
};
use rust_decimal::Decimal;
use sqlx::postgres::PgExecutor;
use sqlx::FromRow;
use uuid::Uuid;

use domain_purchase::{
    LedgerStore, Payment, PaymentDetails, Purchase, PurchaseStatus, SettlementCommit, StoreError,
    Transition, Voucher,
};

use crate::codec;
use crate::error::DatabaseError;
use crate::pool::DatabasePool;

const PURCHASE_COLUMNS: &str = "id, product_id, customer_id, buyer_id, kind, status, \
     unit_price, currency, quantity, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, purchase_id, method, status, amount, currency, \
     due_date, description, details, created_at";

const TRANSITION_COLUMNS: &str = "id, payment_id, old_status, new_status, source, \
     payload, error_tag, paid_date, created_at";

const VOUCHER_COLUMNS: &str = "id, hash_code, description, discount, product_id, \
     creator_id, valid_from, valid_until, consumed_by, created_at";

/// PostgreSQL implementation of the ledger persistence port
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: DatabasePool,
}

impl PgLedgerStore {
    /// Creates a new store over the given connection pool
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct PurchaseRow {
    id: Uuid,
    product_id: Uuid,
    customer_id: Uuid,
    buyer_id: Uuid,
    kind: String,
    status: String,
    unit_price: Decimal,
    currency: String,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PurchaseRow {
    fn into_domain(self) -> Result<Purchase, StoreError> {
        let currency: Currency = codec::decode("currency", &self.currency)?;
        let quantity = u32::try_from(self.quantity)
            .map_err(|_| StoreError::Corrupt(format!("negative quantity: {}", self.quantity)))?;

        Ok(Purchase {
            id: PurchaseId::from_uuid(self.id),
            product_id: ProductId::from_uuid(self.product_id),
            customer_id: AccountId::from_uuid(self.customer_id),
            buyer_id: BuyerId::from_uuid(self.buyer_id),
            kind: codec::decode("kind", &self.kind)?,
            status: codec::decode("status", &self.status)?,
            unit_price: Money::new(self.unit_price, currency),
            quantity,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct PaymentRow {
    id: Uuid,
    purchase_id: Uuid,
    method: String,
    status: String,
    amount: Decimal,
    currency: String,
    due_date: Option<NaiveDate>,
    description: Option<String>,
    details: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_domain(self) -> Result<Payment, StoreError> {
        let currency: Currency = codec::decode("currency", &self.currency)?;
        let details: PaymentDetails = serde_json::from_value(self.details)
            .map_err(|e| StoreError::Corrupt(format!("unreadable payment details: {e}")))?;
        let method = self
            .method
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("unknown method: {}", self.method)))?;

        Ok(Payment {
            id: PaymentId::from_uuid(self.id),
            purchase_id: PurchaseId::from_uuid(self.purchase_id),
            method,
            status: codec::decode("status", &self.status)?,
            amount: Money::new(self.amount, currency),
            due_date: self.due_date,
            description: self.description,
            details,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct TransitionRow {
    id: Uuid,
    payment_id: Uuid,
    old_status: String,
    new_status: String,
    source: String,
    payload: serde_json::Value,
    error_tag: Option<String>,
    paid_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl TransitionRow {
    fn into_domain(self) -> Result<Transition, StoreError> {
        let error = match self.error_tag {
            Some(tag) => Some(codec::decode("error_tag", &tag)?),
            None => None,
        };

        Ok(Transition {
            id: TransitionId::from_uuid(self.id),
            payment_id: PaymentId::from_uuid(self.payment_id),
            old_status: codec::decode("old_status", &self.old_status)?,
            new_status: codec::decode("new_status", &self.new_status)?,
            source: codec::decode("source", &self.source)?,
            payload: self.payload,
            error,
            paid_date: self.paid_date,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct VoucherRow {
    id: Uuid,
    hash_code: String,
    description: String,
    discount: Decimal,
    product_id: Uuid,
    creator_id: Uuid,
    valid_from: NaiveDate,
    valid_until: NaiveDate,
    consumed_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl VoucherRow {
    fn into_domain(self) -> Result<Voucher, StoreError> {
        let window = core_kernel::ValidityWindow::new(self.valid_from, self.valid_until)
            .map_err(|e| StoreError::Corrupt(format!("invalid voucher window: {e}")))?;

        Ok(Voucher {
            id: VoucherId::from_uuid(self.id),
            hash_code: self.hash_code,
            description: self.description,
            discount: core_kernel::Rate::new(self.discount),
            product_id: ProductId::from_uuid(self.product_id),
            creator_id: AccountId::from_uuid(self.creator_id),
            window,
            consumed_by: self.consumed_by.map(PaymentId::from_uuid),
            created_at: self.created_at,
        })
    }
}

/// The bank-facing slip reference, pulled out of the details for indexing
fn slip_number_of(payment: &Payment) -> Option<&str> {
    match &payment.details {
        PaymentDetails::BankSlip { our_number, .. } => Some(our_number.as_str()),
        _ => None,
    }
}

async fn fetch_purchase(
    executor: impl PgExecutor<'_>,
    id: PurchaseId,
    for_update: bool,
) -> Result<Purchase, StoreError> {
    let suffix = if for_update { " FOR UPDATE" } else { "" };
    let sql = format!("SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = $1{suffix}");

    let row: Option<PurchaseRow> = sqlx::query_as(&sql)
        .bind(id.as_uuid())
        .fetch_optional(executor)
        .await
        .map_err(DatabaseError::from)?;

    row.ok_or_else(|| StoreError::not_found("purchase", id))?
        .into_domain()
}

async fn fetch_payment(
    executor: impl PgExecutor<'_>,
    purchase_id: PurchaseId,
    payment_id: PaymentId,
    for_update: bool,
) -> Result<Payment, StoreError> {
    let suffix = if for_update { " FOR UPDATE" } else { "" };
    let sql = format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1 AND purchase_id = $2{suffix}"
    );

    let row: Option<PaymentRow> = sqlx::query_as(&sql)
        .bind(payment_id.as_uuid())
        .bind(purchase_id.as_uuid())
        .fetch_optional(executor)
        .await
        .map_err(DatabaseError::from)?;

    row.ok_or_else(|| StoreError::not_found("payment", payment_id))?
        .into_domain()
}

async fn fetch_payments_of(
    executor: impl PgExecutor<'_>,
    purchase_id: PurchaseId,
) -> Result<Vec<Payment>, StoreError> {
    let sql = format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE purchase_id = $1 ORDER BY created_at, id"
    );

    let rows: Vec<PaymentRow> = sqlx::query_as(&sql)
        .bind(purchase_id.as_uuid())
        .fetch_all(executor)
        .await
        .map_err(DatabaseError::from)?;

    rows.into_iter().map(PaymentRow::into_domain).collect()
}

async fn fetch_transitions_of(
    executor: impl PgExecutor<'_>,
    payment_id: PaymentId,
) -> Result<Vec<Transition>, StoreError> {
    // ordinal breaks created_at ties in insertion order
    let sql = format!(
        "SELECT {TRANSITION_COLUMNS} FROM transitions \
         WHERE payment_id = $1 ORDER BY created_at, ordinal"
    );

    let rows: Vec<TransitionRow> = sqlx::query_as(&sql)
        .bind(payment_id.as_uuid())
        .fetch_all(executor)
        .await
        .map_err(DatabaseError::from)?;

    rows.into_iter().map(TransitionRow::into_domain).collect()
}

async fn insert_transition(
    executor: impl PgExecutor<'_>,
    transition: &Transition,
) -> Result<(), StoreError> {
    let error_tag = match &transition.error {
        Some(tag) => Some(codec::encode(tag)?),
        None => None,
    };

    sqlx::query(
        "INSERT INTO transitions \
         (id, payment_id, old_status, new_status, source, payload, error_tag, paid_date, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(transition.id.as_uuid())
    .bind(transition.payment_id.as_uuid())
    .bind(codec::encode(&transition.old_status)?)
    .bind(codec::encode(&transition.new_status)?)
    .bind(codec::encode(&transition.source)?)
    .bind(&transition.payload)
    .bind(error_tag)
    .bind(transition.paid_date)
    .bind(transition.created_at)
    .execute(executor)
    .await
    .map_err(DatabaseError::from)?;

    Ok(())
}

async fn update_payment_status(
    executor: impl PgExecutor<'_>,
    payment: &Payment,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE payments SET status = $2 WHERE id = $1")
        .bind(payment.id.as_uuid())
        .bind(codec::encode(&payment.status)?)
        .execute(executor)
        .await
        .map_err(DatabaseError::from)?;

    Ok(())
}

async fn update_purchase_status(
    executor: impl PgExecutor<'_>,
    purchase: &Purchase,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE purchases SET status = $2, updated_at = $3 WHERE id = $1")
        .bind(purchase.id.as_uuid())
        .bind(codec::encode(&purchase.status)?)
        .bind(purchase.updated_at)
        .execute(executor)
        .await
        .map_err(DatabaseError::from)?;

    Ok(())
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn purchase(&self, id: PurchaseId) -> Result<Purchase, StoreError> {
        fetch_purchase(&self.pool, id, false).await
    }

    async fn insert_purchase(&self, purchase: &Purchase) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO purchases ({PURCHASE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );

        sqlx::query(&sql)
            .bind(purchase.id.as_uuid())
            .bind(purchase.product_id.as_uuid())
            .bind(purchase.customer_id.as_uuid())
            .bind(purchase.buyer_id.as_uuid())
            .bind(codec::encode(&purchase.kind)?)
            .bind(codec::encode(&purchase.status)?)
            .bind(purchase.unit_price.amount())
            .bind(purchase.unit_price.currency().code())
            .bind(purchase.quantity as i32)
            .bind(purchase.created_at)
            .bind(purchase.updated_at)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        Ok(())
    }

    async fn payment(
        &self,
        purchase_id: PurchaseId,
        payment_id: PaymentId,
    ) -> Result<Payment, StoreError> {
        fetch_payment(&self.pool, purchase_id, payment_id, false).await
    }

    async fn payments_of(&self, purchase_id: PurchaseId) -> Result<Vec<Payment>, StoreError> {
        fetch_payments_of(&self.pool, purchase_id).await
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        let details = serde_json::to_value(&payment.details)
            .map_err(|e| StoreError::Corrupt(format!("unserializable payment details: {e}")))?;
        let sql = format!(
            "INSERT INTO payments ({PAYMENT_COLUMNS}, slip_our_number) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );

        sqlx::query(&sql)
            .bind(payment.id.as_uuid())
            .bind(payment.purchase_id.as_uuid())
            .bind(payment.method.as_str())
            .bind(codec::encode(&payment.status)?)
            .bind(payment.amount.amount())
            .bind(payment.amount.currency().code())
            .bind(payment.due_date)
            .bind(payment.description.as_deref())
            .bind(&details)
            .bind(payment.created_at)
            .bind(slip_number_of(payment))
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        Ok(())
    }

    async fn update_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        let details = serde_json::to_value(&payment.details)
            .map_err(|e| StoreError::Corrupt(format!("unserializable payment details: {e}")))?;

        let result = sqlx::query(
            "UPDATE payments SET status = $2, due_date = $3, description = $4, \
             details = $5, slip_our_number = $6 WHERE id = $1",
        )
        .bind(payment.id.as_uuid())
        .bind(codec::encode(&payment.status)?)
        .bind(payment.due_date)
        .bind(payment.description.as_deref())
        .bind(&details)
        .bind(slip_number_of(payment))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("payment", payment.id));
        }
        Ok(())
    }

    async fn next_payment_sequence(&self) -> Result<u64, StoreError> {
        let (next,): (i64,) = sqlx::query_as("SELECT nextval('payment_reference_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        u64::try_from(next)
            .map_err(|_| StoreError::Corrupt(format!("negative sequence value: {next}")))
    }

    async fn transitions_of(&self, payment_id: PaymentId) -> Result<Vec<Transition>, StoreError> {
        fetch_transitions_of(&self.pool, payment_id).await
    }

    async fn commit_settlement(
        &self,
        purchase_id: PurchaseId,
        payment_id: PaymentId,
        transition: Transition,
        requires_document_review: bool,
    ) -> Result<SettlementCommit, StoreError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        // lock order: purchase first, then payment
        let mut purchase = fetch_purchase(&mut *tx, purchase_id, true).await?;
        let mut payment = fetch_payment(&mut *tx, purchase_id, payment_id, true).await?;
        let previous_purchase_status = purchase.status;

        insert_transition(&mut *tx, &transition).await?;

        let transitions = fetch_transitions_of(&mut *tx, payment_id).await?;
        payment.status = payment.recalculated_status(&transitions);
        update_payment_status(&mut *tx, &payment).await?;

        let payments = fetch_payments_of(&mut *tx, purchase_id).await?;
        purchase.status = purchase.recalculated_status(&payments, requires_document_review);
        purchase.updated_at = Utc::now();
        update_purchase_status(&mut *tx, &purchase).await?;

        tx.commit().await.map_err(DatabaseError::from)?;

        let newly_satisfied = previous_purchase_status != PurchaseStatus::Paid
            && purchase.status == PurchaseStatus::Paid;

        Ok(SettlementCommit {
            previous_purchase_status,
            purchase,
            payment,
            transition,
            newly_satisfied,
        })
    }

    async fn set_purchase_status(
        &self,
        id: PurchaseId,
        expected: PurchaseStatus,
        next: PurchaseStatus,
    ) -> Result<Purchase, StoreError> {
        let sql = format!(
            "UPDATE purchases SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = $2 RETURNING {PURCHASE_COLUMNS}"
        );

        let row: Option<PurchaseRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .bind(codec::encode(&expected)?)
            .bind(codec::encode(&next)?)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        match row {
            Some(row) => row.into_domain(),
            None => {
                // distinguish a lost compare-and-set from a missing purchase
                let current = fetch_purchase(&self.pool, id, false).await?;
                Err(StoreError::conflict(format!(
                    "purchase {} is {:?}, expected {:?}",
                    id, current.status, expected
                )))
            }
        }
    }

    async fn payment_by_slip_number(
        &self,
        our_number: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE slip_our_number = $1");

        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(our_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        row.map(PaymentRow::into_domain).transpose()
    }

    async fn vouchers_by_hash(&self, hash_code: &str) -> Result<Vec<Voucher>, StoreError> {
        let sql = format!(
            "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE hash_code = $1 ORDER BY created_at, id"
        );

        let rows: Vec<VoucherRow> = sqlx::query_as(&sql)
            .bind(hash_code)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        rows.into_iter().map(VoucherRow::into_domain).collect()
    }

    async fn insert_vouchers(&self, vouchers: &[Voucher]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        let sql = format!(
            "INSERT INTO vouchers ({VOUCHER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        );

        for voucher in vouchers {
            sqlx::query(&sql)
                .bind(voucher.id.as_uuid())
                .bind(&voucher.hash_code)
                .bind(&voucher.description)
                .bind(voucher.discount.as_decimal())
                .bind(voucher.product_id.as_uuid())
                .bind(voucher.creator_id.as_uuid())
                .bind(voucher.window.start)
                .bind(voucher.window.end)
                .bind(voucher.consumed_by.map(|id| *id.as_uuid()))
                .bind(voucher.created_at)
                .execute(&mut *tx)
                .await
                .map_err(DatabaseError::from)?;
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn consume_voucher(
        &self,
        voucher_id: VoucherId,
        payment_id: PaymentId,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE vouchers SET consumed_by = $2 WHERE id = $1 AND consumed_by IS NULL",
        )
        .bind(voucher_id.as_uuid())
        .bind(payment_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM vouchers WHERE id = $1)")
                .bind(voucher_id.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(DatabaseError::from)?;

        if exists {
            Err(StoreError::conflict(format!(
                "voucher {voucher_id} already consumed"
            )))
        } else {
            Err(StoreError::not_found("voucher", voucher_id))
        }
    }
}
