//! SQLx-backed product catalog
//!
//! The catalog proper is owned by another part of the platform; the ledger
//! reads the slice of each product that drives pricing, eligibility, and
//! slip due-date policy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_kernel::{Currency, Money, ProductId};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use domain_purchase::{Product, ProductCatalog, StoreError};

use crate::codec;
use crate::error::DatabaseError;
use crate::pool::DatabasePool;

/// PostgreSQL implementation of the product catalog port
#[derive(Debug, Clone)]
pub struct PgProductCatalog {
    pool: DatabasePool,
}

impl PgProductCatalog {
    /// Creates a new catalog over the given connection pool
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    description: String,
    category: String,
    price: Decimal,
    currency: String,
    sold_until: DateTime<Utc>,
    slip_due_days: i32,
    variable_price: bool,
    minimum_amount: Decimal,
    voucher_audience: Option<String>,
}

impl ProductRow {
    fn into_domain(self) -> Result<Product, StoreError> {
        let currency: Currency = codec::decode("currency", &self.currency)?;
        let slip_due_days = u32::try_from(self.slip_due_days).map_err(|_| {
            StoreError::Corrupt(format!("negative slip_due_days: {}", self.slip_due_days))
        })?;
        let voucher_audience = match self.voucher_audience {
            Some(audience) => Some(codec::decode("voucher_audience", &audience)?),
            None => None,
        };

        Ok(Product {
            id: ProductId::from_uuid(self.id),
            description: self.description,
            category: codec::decode("category", &self.category)?,
            price: Money::new(self.price, currency),
            sold_until: self.sold_until,
            slip_due_days,
            variable_price: self.variable_price,
            minimum_amount: Money::new(self.minimum_amount, currency),
            voucher_audience,
        })
    }
}

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn product(&self, id: ProductId) -> Result<Product, StoreError> {
        let row: Option<ProductRow> = sqlx::query_as(
            "SELECT id, description, category, price, currency, sold_until, \
             slip_due_days, variable_price, minimum_amount, voucher_audience \
             FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        row.ok_or_else(|| StoreError::not_found("product", id))?
            .into_domain()
    }
}
