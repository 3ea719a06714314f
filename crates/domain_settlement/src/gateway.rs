//! Shared plumbing for outbound gateway clients
//!
//! Both checkout gateways talk HTTP through reqwest clients built here, with
//! a bounded timeout from configuration so a hung gateway surfaces as an
//! error instead of a stuck settlement.

use std::time::Duration;

use thiserror::Error;

/// A failed outbound gateway call
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl GatewayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Marks a response the gateway returned but we could not interpret
    pub fn unexpected_response(detail: impl Into<String>) -> Self {
        Self::new(format!("unexpected gateway response: {}", detail.into()))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "gateway request timed out".to_string()
        } else {
            format!("gateway request failed: {err}")
        };
        Self {
            message,
            source: Some(Box::new(err)),
        }
    }
}

/// Connection settings for one payment gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway API
    pub base_url: String,
    /// Merchant credential sent with every request
    pub api_key: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_secs: 30,
        }
    }

    /// Builds the pooled HTTP client used for every call to this gateway
    pub fn build_client(&self) -> Result<reqwest::Client, GatewayError> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(GatewayError::from)
    }
}
