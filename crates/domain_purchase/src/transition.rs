//! Transition audit records
//!
//! Every settlement event becomes exactly one transition. Transitions are
//! append-only and never mutated; they are the audit trail from which
//! payment status is derived.

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{PaymentId, TransitionId};
use serde::{Deserialize, Serialize};

use crate::payment::PaymentStatus;

/// Which channel produced a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionSource {
    /// Server-to-server gateway callback
    Notification,
    /// User-initiated redirect return
    Conclusion,
    /// Bank-slip batch reconciliation
    Batch,
    /// Operator action
    Manual,
}

/// Error tag recorded on a transition that rejects a settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SettlementTag {
    /// Cleared after the legal due date
    LatePayment,
    /// Cleared for less than the payment amount
    InsufficientAmount,
}

/// An immutable record of a payment status change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    /// Unique identifier
    pub id: TransitionId,
    /// Owning payment
    pub payment_id: PaymentId,
    /// Status before the event
    pub old_status: PaymentStatus,
    /// Status after the event
    pub new_status: PaymentStatus,
    /// Channel that produced the event
    pub source: TransitionSource,
    /// Raw settlement payload, opaque and method-specific
    pub payload: serde_json::Value,
    /// Error tag when the settlement was rejected
    pub error: Option<SettlementTag>,
    /// Day the money actually moved, when the payload reports one
    pub paid_date: Option<NaiveDate>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Transition {
    /// Creates a new transition
    pub fn new(
        payment_id: PaymentId,
        old_status: PaymentStatus,
        new_status: PaymentStatus,
        source: TransitionSource,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: TransitionId::new_v7(),
            payment_id,
            old_status,
            new_status,
            source,
            payload,
            error: None,
            paid_date: None,
            created_at: Utc::now(),
        }
    }

    /// Attaches an error tag
    pub fn with_error(mut self, tag: SettlementTag) -> Self {
        self.error = Some(tag);
        self
    }

    /// Records the day the money moved
    pub fn with_paid_date(mut self, paid_date: NaiveDate) -> Self {
        self.paid_date = Some(paid_date);
        self
    }

    /// True for the transition that settles its payment:
    /// it left a non-paid status and arrived at paid
    pub fn is_settlement(&self) -> bool {
        self.old_status != PaymentStatus::Paid && self.new_status == PaymentStatus::Paid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settlement_detection() {
        let t = Transition::new(
            PaymentId::new(),
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            TransitionSource::Notification,
            serde_json::json!({}),
        );
        assert!(t.is_settlement());
    }

    #[test]
    fn test_duplicate_paid_is_not_a_settlement() {
        let t = Transition::new(
            PaymentId::new(),
            PaymentStatus::Paid,
            PaymentStatus::Paid,
            TransitionSource::Notification,
            serde_json::json!({}),
        );
        assert!(!t.is_settlement());
    }

    #[test]
    fn test_rejection_keeps_pending() {
        let t = Transition::new(
            PaymentId::new(),
            PaymentStatus::Pending,
            PaymentStatus::Pending,
            TransitionSource::Batch,
            serde_json::json!({}),
        )
        .with_error(SettlementTag::LatePayment);

        assert!(!t.is_settlement());
        assert_eq!(t.error, Some(SettlementTag::LatePayment));
    }
}
