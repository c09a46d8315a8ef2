use thiserror::Error;

use crate::api::client::Capability;
use crate::api::error::ApiError;

/// Typed failures of the candle-history engine.
///
/// Every variant except `ExchangeRequest` and `Cancelled` is raised before
/// any network I/O takes place.
#[derive(Error, Debug)]
pub enum CandleError {
    #[error("Unknown timeframe: {timeframe}")]
    UnknownTimeframe { timeframe: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid range: end {end_ms} is not after start {start_ms}")]
    InvalidRange { start_ms: i64, end_ms: i64 },

    #[error("Invalid ticker {ticker} for exchange {exchange}")]
    InvalidTicker { exchange: String, ticker: String },

    #[error("Timeframe {timeframe} is not supported by the exchange")]
    InvalidTimeframe { timeframe: String },

    #[error("Exchange does not support {capability}")]
    UnsupportedCapability { capability: Capability },

    #[error("Exchange request failed: {0}")]
    ExchangeRequest(#[source] ApiError),

    #[error("Candle request cancelled")]
    Cancelled,
}

impl CandleError {
    /// True for failures detected before touching the network
    pub fn is_validation(&self) -> bool {
        !matches!(self, CandleError::ExchangeRequest(_) | CandleError::Cancelled)
    }
}
