use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::ApiError;
use crate::models::{Candle, FeeSchedule, MarketSnapshot, Ticker};

/// Configuration for rate limiting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_size: u32,
}

/// Extra exchange-specific query parameters, appended verbatim
pub type ExtraParams = BTreeMap<String, String>;

/// Operations an exchange client may or may not implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    FetchOhlcv,
    FetchTicker,
    LoadMarkets,
    RawKlines,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::FetchOhlcv => "fetch_ohlcv",
            Capability::FetchTicker => "fetch_ticker",
            Capability::LoadMarkets => "load_markets",
            Capability::RawKlines => "raw_klines",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fetch_ohlcv" => Ok(Capability::FetchOhlcv),
            "fetch_ticker" => Ok(Capability::FetchTicker),
            "load_markets" => Ok(Capability::LoadMarkets),
            "raw_klines" => Ok(Capability::RawKlines),
            other => Err(other.to_string()),
        }
    }
}

/// Request parameters for one page of OHLCV data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OhlcvRequest {
    /// Venue-specific market id (e.g., "BTCUSDT")
    pub symbol: String,
    /// Unified timeframe label (e.g., "1h")
    pub timeframe: String,
    /// First candle open time to return (Unix milliseconds)
    pub since: Option<i64>,
    /// Maximum number of candles (None = exchange default)
    pub limit: Option<u32>,
    pub params: ExtraParams,
}

/// Request parameters for a raw kline call bounded by explicit start/end
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KlinesRequest {
    pub symbol: String,
    pub timeframe: String,
    /// Unix milliseconds
    pub start_time: Option<i64>,
    /// Unix milliseconds
    pub end_time: Option<i64>,
    pub limit: Option<u32>,
    pub params: ExtraParams,
}

/// Core trait that all exchange clients must implement
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Get the exchange name (e.g., "binance", "bitget")
    fn exchange_name(&self) -> &str;

    /// Static table of operations this client implements
    fn capabilities(&self) -> &'static [Capability];

    fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Fetch the symbols and timeframes the exchange supports
    async fn load_markets(&self) -> Result<MarketSnapshot, ApiError>;

    /// Fetch a single page of candles, ascending by open time
    async fn fetch_ohlcv(&self, request: OhlcvRequest) -> Result<Vec<Candle>, ApiError>;

    /// Fetch the latest quote for a venue-specific market id
    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ApiError>;

    /// Single raw kline call with explicit start/end bounds
    async fn fetch_raw_klines(&self, request: KlinesRequest) -> Result<Vec<Candle>, ApiError> {
        let _ = request;
        Err(ApiError::UnsupportedOperation {
            exchange: self.exchange_name().to_string(),
            operation: Capability::RawKlines.to_string(),
        })
    }

    /// Trading fee rates
    fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule::for_exchange(self.exchange_name())
    }

    /// Get rate limit configuration for this exchange
    fn rate_limit(&self) -> RateLimitConfig;
}
