//! API error handling
//!
//! Domain errors map onto a small set of stable error kinds: validation
//! failures are 400, lost races and exhausted resources 409, terminal
//! purchases 410, missing records 404, and gateway failures 502.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain_purchase::{PurchaseError, StoreError};
use domain_settlement::SettlementError;
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Gone: {0}")]
    Gone(String),

    #[error("Upstream gateway failure: {0}")]
    BadGateway(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Gone(msg) => (StatusCode::GONE, "gone", msg.clone()),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg.clone()),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<PurchaseError> for ApiError {
    fn from(err: PurchaseError) -> Self {
        let message = err.to_string();
        match err {
            PurchaseError::PurchaseIsStale => ApiError::Gone(message),
            PurchaseError::AlreadySatisfied
            | PurchaseError::SalesClosed
            | PurchaseError::VoucherAlreadyUsed(_) => ApiError::Conflict(message),
            _ => ApiError::BadRequest(message),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(message),
            StoreError::Conflict(_) => ApiError::Conflict(message),
            StoreError::Connection { .. } | StoreError::Corrupt(_) => ApiError::Internal(message),
        }
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::Purchase(inner) => inner.into(),
            SettlementError::Store(inner) => inner.into(),
            SettlementError::InvalidNotification(message) => ApiError::BadRequest(message),
            SettlementError::ExternalService { .. } => ApiError::BadGateway(err.to_string()),
        }
    }
}
