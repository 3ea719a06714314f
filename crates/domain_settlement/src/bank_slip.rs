//! Bank-slip settlement
//!
//! Slips clear offline: the processor issues a bank-facing sequential
//! reference at creation, and settlement arrives later through the batch
//! reconciler or a manual notify. A clearing dated after the legal due date
//! or covering less than the payment's amount is rejected with an error tag
//! instead of settling.

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use core_kernel::Money;
use domain_purchase::{
    LedgerStore, Payment, PaymentDetails, PaymentMethod, PaymentStatus, Product, Purchase,
    SettlementTag, Transition, TransitionSource,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::SettlementError;
use crate::processor::{
    payload_json, CreatePaymentRequest, NotificationPayload, PaymentInstructions, PaymentProcessor,
};

/// Bank-slip issuing parameters
#[derive(Debug, Clone)]
pub struct SlipConfig {
    /// Added to the payment sequence to form the bank-facing reference
    pub our_number_offset: u64,
}

impl Default for SlipConfig {
    fn default() -> Self {
        Self {
            our_number_offset: 300_000,
        }
    }
}

pub struct BankSlipProcessor {
    store: Arc<dyn LedgerStore>,
    config: SlipConfig,
}

impl BankSlipProcessor {
    pub fn new(store: Arc<dyn LedgerStore>, config: SlipConfig) -> Self {
        Self { store, config }
    }

    /// Formats a sequence number into the ten-digit bank reference
    pub fn our_number(&self, sequence: u64) -> String {
        format!("{:010}", self.config.our_number_offset + sequence)
    }
}

/// Parses the `paid_amount` and `paid_date` keys of a clearing payload
fn parse_clearing(payload: &NotificationPayload) -> Result<(Decimal, NaiveDate), SettlementError> {
    let amount = payload
        .get("paid_amount")
        .ok_or_else(|| SettlementError::invalid_notification("missing paid_amount"))?
        .parse::<Decimal>()
        .map_err(|_| SettlementError::invalid_notification("unparseable paid_amount"))?;

    let date = payload
        .get("paid_date")
        .ok_or_else(|| SettlementError::invalid_notification("missing paid_date"))?
        .parse::<NaiveDate>()
        .map_err(|_| SettlementError::invalid_notification("unparseable paid_date"))?;

    Ok((amount, date))
}

#[async_trait]
impl PaymentProcessor for BankSlipProcessor {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::BankSlip
    }

    async fn create(
        &self,
        purchase: &Purchase,
        product: &Product,
        amount: Money,
        _request: &CreatePaymentRequest,
    ) -> Result<Payment, SettlementError> {
        let sequence = self.store.next_payment_sequence().await?;
        let due_date = Utc::now()
            .date_naive()
            .checked_add_days(Days::new(u64::from(product.slip_due_days)))
            .unwrap_or_else(|| Utc::now().date_naive());

        let details = PaymentDetails::BankSlip {
            our_number: self.our_number(sequence),
            document_hash: Uuid::new_v4().simple().to_string(),
            legal_due_date: due_date,
        };

        Ok(Payment::new(purchase.id, PaymentMethod::BankSlip, amount, details)
            .with_due_date(due_date)
            .with_description(format!("Bank slip for {}", product.description)))
    }

    async fn process(
        &self,
        payment: &mut Payment,
        _purchase: &Purchase,
    ) -> Result<PaymentInstructions, SettlementError> {
        match &payment.details {
            PaymentDetails::BankSlip {
                our_number,
                document_hash,
                legal_due_date,
            } => Ok(PaymentInstructions::BankSlip {
                our_number: our_number.clone(),
                document_hash: document_hash.clone(),
                due_date: *legal_due_date,
                amount: payment.amount,
            }),
            _ => Err(SettlementError::invalid_notification(
                "payment does not carry bank-slip details",
            )),
        }
    }

    async fn notify(
        &self,
        _purchase: &Purchase,
        payment: &Payment,
        payload: &NotificationPayload,
        source: TransitionSource,
    ) -> Result<Transition, SettlementError> {
        let (paid_amount, paid_date) = parse_clearing(payload)?;
        let legal_due_date = payment.legal_due_date().ok_or_else(|| {
            SettlementError::invalid_notification("payment does not carry bank-slip details")
        })?;

        let transition = if paid_date > legal_due_date {
            warn!(payment_id = %payment.id, %paid_date, "late slip clearing rejected");
            Transition::new(
                payment.id,
                payment.status,
                PaymentStatus::Pending,
                source,
                payload_json(payload),
            )
            .with_error(SettlementTag::LatePayment)
            .with_paid_date(paid_date)
        } else if paid_amount < payment.amount.amount() {
            warn!(payment_id = %payment.id, %paid_amount, "insufficient slip clearing rejected");
            Transition::new(
                payment.id,
                payment.status,
                PaymentStatus::Pending,
                source,
                payload_json(payload),
            )
            .with_error(SettlementTag::InsufficientAmount)
            .with_paid_date(paid_date)
        } else {
            Transition::new(
                payment.id,
                payment.status,
                PaymentStatus::Paid,
                source,
                payload_json(payload),
            )
            .with_paid_date(paid_date)
        };

        Ok(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_our_number_is_ten_digits_from_offset() {
        let config = SlipConfig {
            our_number_offset: 300_000,
        };
        assert_eq!(format!("{:010}", config.our_number_offset + 333), "0000300333");
    }

    #[test]
    fn test_clearing_parse_rejects_garbage() {
        let mut payload = NotificationPayload::new();
        payload.insert("paid_amount".to_string(), "not-a-number".to_string());
        payload.insert("paid_date".to_string(), "2026-06-10".to_string());

        assert!(parse_clearing(&payload).is_err());
    }

    #[test]
    fn test_clearing_parse_accepts_well_formed_lines() {
        let mut payload = NotificationPayload::new();
        payload.insert("paid_amount".to_string(), "120.00".to_string());
        payload.insert("paid_date".to_string(), "2026-06-10".to_string());

        let (amount, date) = parse_clearing(&payload).unwrap();
        assert_eq!(amount, "120.00".parse::<Decimal>().unwrap());
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 6, 10).unwrap());
    }
}
