//! API configuration

use rust_decimal::Decimal;
use serde::Deserialize;

/// API configuration, loaded from the environment with the `API_` prefix
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// Frontend base URL; conclusion redirects land under it
    pub frontend_url: String,
    /// Web-checkout gateway base URL
    pub checkout_url: String,
    /// Web-checkout merchant credential
    pub checkout_api_key: String,
    /// Express-checkout gateway base URL
    pub express_url: String,
    /// Express-checkout merchant credential
    pub express_api_key: String,
    /// Timeout for outbound gateway calls, in seconds
    pub gateway_timeout_secs: u64,
    /// Global floor for variable-price amounts, in BRL
    pub minimum_donation: Decimal,
    /// Offset added to the payment sequence to form slip reference numbers
    pub slip_number_offset: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/turnstile".to_string(),
            log_level: "info".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            checkout_url: "https://checkout.gateway.test".to_string(),
            checkout_api_key: "dev-checkout-key".to_string(),
            express_url: "https://express.gateway.test".to_string(),
            express_api_key: "dev-express-key".to_string(),
            gateway_timeout_secs: 30,
            minimum_donation: Decimal::new(1000, 2),
            slip_number_offset: 300_000,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.slip_number_offset, 300_000);
        assert_eq!(config.minimum_donation, Decimal::new(1000, 2));
    }
}
