//! Request handlers

pub mod health;
pub mod payments;
pub mod purchases;
pub mod reconcile;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses a prefixed or bare path identifier
pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("malformed {what} id: {raw}")))
}
