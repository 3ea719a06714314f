use domain_purchase::{PurchaseError, StoreError};
use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors raised while orchestrating or processing settlements
#[derive(Debug, Error)]
pub enum SettlementError {
    /// Purchase-domain rule violation
    #[error(transparent)]
    Purchase(#[from] PurchaseError),

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The settlement payload was malformed or inconsistent with the
    /// payment it claims to settle
    #[error("Invalid payment notification: {0}")]
    InvalidNotification(String),

    /// An outbound gateway call failed or timed out; never reported as
    /// success
    #[error("External service error from {gateway}: {message}")]
    ExternalService {
        gateway: &'static str,
        message: String,
        #[source]
        source: Option<GatewayError>,
    },
}

impl SettlementError {
    pub fn invalid_notification(message: impl Into<String>) -> Self {
        SettlementError::InvalidNotification(message.into())
    }

    /// Wraps a gateway failure, tagging which gateway produced it
    pub fn external(gateway: &'static str, error: GatewayError) -> Self {
        SettlementError::ExternalService {
            gateway,
            message: error.to_string(),
            source: Some(error),
        }
    }
}
