use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::api::client::RateLimitConfig;
use crate::api::error::ApiError;

fn default_enable_rate_limit() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

/// Rate limit override as it appears in settings files
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub requests_per_second: u32,
    pub burst_size: u32,
}

/// Connection settings for one exchange client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeSettings {
    /// Exchange name (e.g., "binance", "bitget")
    pub exchange: String,
    /// Override for the REST base URL (testing, regional endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_enable_rate_limit")]
    pub enable_rate_limit: bool,
    /// Replaces the exchange's built-in rate limit when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitSettings>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ExchangeSettings {
    pub fn new(exchange: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            base_url: None,
            enable_rate_limit: default_enable_rate_limit(),
            rate_limit: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn without_rate_limit(mut self) -> Self {
        self.enable_rate_limit = false;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ApiError> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|e| ApiError::ConfigError(format!("Invalid exchange settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ApiError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    fn validate(&self) -> Result<(), ApiError> {
        if self.exchange.trim().is_empty() {
            return Err(ApiError::ConfigError("Exchange name is empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ApiError::ConfigError("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Effective rate limit: the override if present, otherwise the exchange default
    pub fn rate_limit_or(&self, default: RateLimitConfig) -> RateLimitConfig {
        self.rate_limit
            .map(|limit| RateLimitConfig {
                requests_per_second: limit.requests_per_second,
                burst_size: limit.burst_size,
            })
            .unwrap_or(default)
    }
}
