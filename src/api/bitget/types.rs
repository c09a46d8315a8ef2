use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// BitGet API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitgetResponse<T> {
    pub code: String,
    pub msg: String,
    pub data: Option<T>,
    #[serde(rename = "requestTime")]
    pub request_time: Option<i64>,
}

/// Spot symbol entry from `/api/v2/spot/public/symbols`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitgetSymbol {
    /// Market id (e.g., "BTCUSDT")
    pub symbol: String,

    /// Base coin (e.g., "BTC")
    #[serde(rename = "baseCoin")]
    pub base_coin: String,

    /// Quote coin (e.g., "USDT")
    #[serde(rename = "quoteCoin")]
    pub quote_coin: String,

    /// "online", "offline", "gray", "halt"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// One candle row: `[ts, open, high, low, close, baseVolume, usdtVolume, quoteVolume]`,
/// every element a string
pub type BitgetCandleRow = Vec<String>;

/// Query for `/api/v2/spot/market/candles`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandlesRequest {
    pub symbol: String,

    /// Bitget granularity (e.g., "1min", "1h", "1day")
    pub granularity: String,

    /// Start time (Unix milliseconds, optional)
    #[serde(rename = "startTime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    /// End time (Unix milliseconds, optional)
    #[serde(rename = "endTime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,

    /// Limit (max 1000)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,

    /// Caller-supplied extra query parameters
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// Spot ticker from `/api/v2/spot/market/tickers`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitgetTicker {
    pub symbol: String,

    /// Last traded price
    #[serde(rename = "lastPr")]
    pub last_pr: String,

    #[serde(rename = "bidPr", skip_serializing_if = "Option::is_none")]
    pub bid_pr: Option<String>,

    #[serde(rename = "askPr", skip_serializing_if = "Option::is_none")]
    pub ask_pr: Option<String>,

    #[serde(rename = "high24h", skip_serializing_if = "Option::is_none")]
    pub high_24h: Option<String>,

    #[serde(rename = "low24h", skip_serializing_if = "Option::is_none")]
    pub low_24h: Option<String>,

    #[serde(rename = "baseVolume", skip_serializing_if = "Option::is_none")]
    pub base_volume: Option<String>,

    #[serde(rename = "quoteVolume", skip_serializing_if = "Option::is_none")]
    pub quote_volume: Option<String>,

    /// Snapshot time (Unix milliseconds)
    pub ts: String,
}
