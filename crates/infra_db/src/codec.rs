//! Text codec for domain enums
//!
//! Status, kind, and source enums are stored as their serde string form
//! (kebab-case), so the database vocabulary and the wire vocabulary stay
//! identical. Decoding failures surface as `StoreError::Corrupt`.

use domain_purchase::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a unit-variant enum to its serde string form
pub fn encode<T: Serialize>(value: &T) -> Result<String, StoreError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => Ok(s),
        _ => Err(StoreError::Corrupt(
            "value did not serialize to a string".to_string(),
        )),
    }
}

/// Decodes a stored string back into its enum
pub fn decode<T: DeserializeOwned>(column: &'static str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::String(raw.to_owned()))
        .map_err(|_| StoreError::Corrupt(format!("unreadable {column} value: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_purchase::{PaymentStatus, PurchaseStatus, TransitionSource};

    #[test]
    fn test_statuses_roundtrip_as_kebab_case() {
        assert_eq!(encode(&PurchaseStatus::DocumentInAnalysis).unwrap(), "document-in-analysis");
        assert_eq!(encode(&PaymentStatus::InAnalysis).unwrap(), "in-analysis");
        assert_eq!(encode(&TransitionSource::Batch).unwrap(), "batch");

        let status: PurchaseStatus = decode("status", "document-in-analysis").unwrap();
        assert_eq!(status, PurchaseStatus::DocumentInAnalysis);
    }

    #[test]
    fn test_unknown_value_is_corrupt() {
        let result: Result<PaymentStatus, _> = decode("status", "settled-maybe");
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }
}
