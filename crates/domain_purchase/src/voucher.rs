//! Discount vouchers and the resolver that validates them
//!
//! Vouchers are issued in batches under a shared hash code and consumed at
//! most once each. The resolver picks, for a given hash code, the first
//! voucher that is simultaneously valid, unused, and eligible for the
//! purchaser.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{AccountId, PaymentId, ProductId, Rate, ValidityWindow, VoucherId};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::buyer::Buyer;
use crate::ports::{LedgerStore, ProductCatalog, StoreError};

/// A promotional code redeemable for a full or partial discount
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    /// Unique identifier
    pub id: VoucherId,
    /// Code handed to attendees; shared across a batch
    pub hash_code: String,
    /// Human-readable description
    pub description: String,
    /// Discount fraction (0 < d <= 1)
    pub discount: Rate,
    /// Product the voucher applies to
    pub product_id: ProductId,
    /// Account that issued the voucher
    pub creator_id: AccountId,
    /// Redemption window, inclusive on both days
    pub window: ValidityWindow,
    /// The payment that consumed this voucher, if any
    pub consumed_by: Option<PaymentId>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Voucher {
    /// Returns true once a payment has consumed this voucher
    pub fn is_used(&self) -> bool {
        self.consumed_by.is_some()
    }

    /// Returns true if the voucher may be redeemed on the given day
    pub fn is_redeemable(&self, day: NaiveDate) -> bool {
        !self.is_used() && self.window.contains(day)
    }
}

/// Parameters for issuing a batch of vouchers
#[derive(Debug, Clone)]
pub struct VoucherBatch {
    pub description: String,
    pub discount: Rate,
    pub product_id: ProductId,
    pub window: ValidityWindow,
    /// Shared code for the whole batch; generated when absent
    pub hash_code: Option<String>,
}

impl VoucherBatch {
    /// Issues `quantity` vouchers, numbering each description
    pub fn issue(&self, quantity: u32, creator: AccountId) -> Vec<Voucher> {
        let hash_code = self
            .hash_code
            .clone()
            .unwrap_or_else(generate_hash_code);

        (1..=quantity)
            .map(|counter| Voucher {
                id: VoucherId::new_v7(),
                hash_code: hash_code.clone(),
                description: format!("{} - {}/{}", self.description, counter, quantity),
                discount: self.discount,
                product_id: self.product_id,
                creator_id: creator,
                window: self.window,
                consumed_by: None,
                created_at: Utc::now(),
            })
            .collect()
    }
}

/// Generates a voucher code like `PC-3F2A9B04C1`
fn generate_hash_code() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("PC-{}", raw[..10].to_uppercase())
}

/// Validates and selects vouchers at purchase- or payment-creation time
pub struct DiscountResolver {
    store: Arc<dyn LedgerStore>,
    catalog: Arc<dyn ProductCatalog>,
}

impl DiscountResolver {
    /// Creates a resolver over the given store and catalog
    pub fn new(store: Arc<dyn LedgerStore>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Finds the first voucher under `hash_code` that is valid today,
    /// unused, and whose product accepts the purchaser
    ///
    /// Consumed siblings of a batch-issued code are never returned.
    pub async fn check(
        &self,
        hash_code: &str,
        buyer: &Buyer,
        today: NaiveDate,
    ) -> Result<Option<Voucher>, StoreError> {
        let candidates = self.store.vouchers_by_hash(hash_code).await?;
        debug!(hash_code, candidates = candidates.len(), "checking voucher");

        for voucher in candidates {
            if !voucher.is_redeemable(today) {
                continue;
            }
            let product = self.catalog.product(voucher.product_id).await?;
            if product.check_voucher_eligibility(buyer) {
                return Ok(Some(voucher));
            }
        }

        Ok(None)
    }

    /// Returns true when vouchers exist under the code but all are consumed
    pub async fn is_exhausted(&self, hash_code: &str) -> Result<bool, StoreError> {
        let candidates = self.store.vouchers_by_hash(hash_code).await?;
        Ok(!candidates.is_empty() && candidates.iter().all(Voucher::is_used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::ValidityWindow;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn batch() -> VoucherBatch {
        VoucherBatch {
            description: "Sponsor seats".to_string(),
            discount: Rate::full(),
            product_id: ProductId::new(),
            window: ValidityWindow::new(day(2026, 5, 1), day(2026, 7, 15)).unwrap(),
            hash_code: Some("PC-SPONSOR".to_string()),
        }
    }

    #[test]
    fn test_batch_issuance_numbers_descriptions() {
        let vouchers = batch().issue(3, AccountId::new());

        assert_eq!(vouchers.len(), 3);
        assert_eq!(vouchers[0].description, "Sponsor seats - 1/3");
        assert_eq!(vouchers[2].description, "Sponsor seats - 3/3");
        assert!(vouchers.iter().all(|v| v.hash_code == "PC-SPONSOR"));
    }

    #[test]
    fn test_generated_codes_share_one_hash_per_batch() {
        let mut request = batch();
        request.hash_code = None;
        let vouchers = request.issue(2, AccountId::new());

        assert_eq!(vouchers[0].hash_code, vouchers[1].hash_code);
        assert!(vouchers[0].hash_code.starts_with("PC-"));
    }

    #[test]
    fn test_redeemable_within_window_only() {
        let voucher = batch().issue(1, AccountId::new()).remove(0);

        assert!(voucher.is_redeemable(day(2026, 7, 15)));
        assert!(!voucher.is_redeemable(day(2026, 7, 16)));
        assert!(!voucher.is_redeemable(day(2026, 4, 30)));
    }

    #[test]
    fn test_used_voucher_is_not_redeemable() {
        let mut voucher = batch().issue(1, AccountId::new()).remove(0);
        voucher.consumed_by = Some(PaymentId::new());

        assert!(!voucher.is_redeemable(day(2026, 6, 1)));
    }

    #[test]
    fn test_discount_fraction_validation() {
        assert!(Rate::new(dec!(0.3)).is_valid_discount());
        assert!(!Rate::new(dec!(0)).is_valid_discount());
    }
}
