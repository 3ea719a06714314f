//! Bank-slip batch reconciliation
//!
//! The bank delivers a settlement file of semicolon-delimited lines:
//! `our_number;paid_amount;paid_date` with the date as `YYYY-MM-DD`.
//! Each record is processed in isolation; one malformed or failing line
//! never aborts the rest. Late clearings are classified before the notify
//! path is entered at all.

use std::sync::Arc;

use chrono::NaiveDate;
use domain_purchase::{LedgerStore, TransitionSource};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::orchestrator::PaymentOrchestrator;
use crate::processor::NotificationPayload;

/// One parsed settlement line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRecord {
    pub our_number: String,
    pub paid_amount: Decimal,
    pub paid_date: NaiveDate,
}

impl SettlementRecord {
    /// Parses `our_number;paid_amount;paid_date`
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split(';');
        let our_number = fields.next()?.trim();
        let paid_amount = fields.next()?.trim().parse::<Decimal>().ok()?;
        let paid_date = fields.next()?.trim().parse::<NaiveDate>().ok()?;
        if our_number.is_empty() || fields.next().is_some() {
            return None;
        }
        Some(Self {
            our_number: our_number.to_string(),
            paid_amount,
            paid_date,
        })
    }
}

/// How a record was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordClass {
    /// Settled cleanly
    Good,
    /// Cleared after the legal due date; notify was never called
    Late,
    /// Notify rejected the clearing (error tag or domain error)
    Bad,
    /// Unparseable line or unknown reference number
    Unknown,
}

/// Per-record result with enough detail to investigate
#[derive(Debug, Clone, Serialize)]
pub struct RecordResult {
    pub line_number: usize,
    pub raw: String,
    pub class: RecordClass,
    pub detail: Option<String>,
}

/// Whole-file summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub good: usize,
    pub late: usize,
    pub bad: usize,
    pub unknown: usize,
    pub records: Vec<RecordResult>,
}

impl BatchSummary {
    fn push(&mut self, record: RecordResult) {
        match record.class {
            RecordClass::Good => self.good += 1,
            RecordClass::Late => self.late += 1,
            RecordClass::Bad => self.bad += 1,
            RecordClass::Unknown => self.unknown += 1,
        }
        self.records.push(record);
    }
}

pub struct SlipBatchReconciler {
    store: Arc<dyn LedgerStore>,
    orchestrator: Arc<PaymentOrchestrator>,
}

impl SlipBatchReconciler {
    pub fn new(store: Arc<dyn LedgerStore>, orchestrator: Arc<PaymentOrchestrator>) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    /// Processes a settlement file, record by record
    pub async fn process(&self, file: &[u8]) -> BatchSummary {
        let text = String::from_utf8_lossy(file);
        let mut summary = BatchSummary::default();

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            if line.trim().is_empty() {
                continue;
            }
            let result = self.process_line(line_number, line).await;
            summary.push(result);
        }

        info!(
            good = summary.good,
            late = summary.late,
            bad = summary.bad,
            unknown = summary.unknown,
            "settlement batch processed"
        );
        summary
    }

    async fn process_line(&self, line_number: usize, raw: &str) -> RecordResult {
        let result = |class, detail: Option<String>| RecordResult {
            line_number,
            raw: raw.to_string(),
            class,
            detail,
        };

        let Some(record) = SettlementRecord::parse(raw) else {
            warn!(line_number, "unparseable settlement line");
            return result(RecordClass::Unknown, Some("unparseable line".to_string()));
        };

        let payment = match self.store.payment_by_slip_number(&record.our_number).await {
            Ok(Some(payment)) => payment,
            Ok(None) => {
                return result(
                    RecordClass::Unknown,
                    Some(format!("no payment with reference {}", record.our_number)),
                )
            }
            Err(err) => return result(RecordClass::Bad, Some(err.to_string())),
        };

        // late-check first; a late clearing never enters the notify path
        if let Some(legal_due_date) = payment.legal_due_date() {
            if record.paid_date > legal_due_date {
                return result(
                    RecordClass::Late,
                    Some(format!("cleared {} after {legal_due_date}", record.paid_date)),
                );
            }
        }

        let mut payload = NotificationPayload::new();
        payload.insert("paid_amount".to_string(), record.paid_amount.to_string());
        payload.insert("paid_date".to_string(), record.paid_date.to_string());

        match self
            .orchestrator
            .notify(
                payment.purchase_id,
                payment.id,
                &payload,
                TransitionSource::Batch,
            )
            .await
        {
            Ok(receipt) => {
                let error_tag = receipt.transition.as_ref().and_then(|t| t.error);
                match error_tag {
                    Some(tag) => result(RecordClass::Bad, Some(format!("{tag:?}"))),
                    None => result(RecordClass::Good, None),
                }
            }
            Err(err) => result(RecordClass::Bad, Some(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_well_formed_line() {
        let record = SettlementRecord::parse("0000300333;120.00;2026-06-10").unwrap();
        assert_eq!(record.our_number, "0000300333");
        assert_eq!(record.paid_amount, dec!(120.00));
        assert_eq!(
            record.paid_date,
            NaiveDate::from_ymd_opt(2026, 6, 10).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(SettlementRecord::parse("garbage").is_none());
        assert!(SettlementRecord::parse(";120.00;2026-06-10").is_none());
        assert!(SettlementRecord::parse("0000300333;twelve;2026-06-10").is_none());
        assert!(SettlementRecord::parse("0000300333;120.00;10/06/2026").is_none());
        assert!(SettlementRecord::parse("0000300333;120.00;2026-06-10;extra").is_none());
    }
}
