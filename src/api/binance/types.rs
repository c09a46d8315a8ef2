use serde::{Deserialize, Serialize};

/// Binance REST error payload, e.g. `{"code": -1121, "msg": "Invalid symbol."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceErrorResponse {
    pub code: i64,
    pub msg: String,
}

/// `/api/v3/exchangeInfo` response (only the fields we read)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceExchangeInfo {
    pub symbols: Vec<BinanceSymbol>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceSymbol {
    /// Market id (e.g., "BTCUSDT")
    pub symbol: String,
    /// "TRADING", "BREAK", ...
    pub status: String,
    #[serde(rename = "baseAsset")]
    pub base_asset: String,
    #[serde(rename = "quoteAsset")]
    pub quote_asset: String,
}

/// One kline row as Binance sends it:
/// `[open_time, open, high, low, close, volume, close_time, quote_volume,
///   trade_count, taker_buy_base, taker_buy_quote, ignore]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinanceKline(
    pub i64,
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
    pub i64,
    pub String,
    pub u64,
    pub String,
    pub String,
    pub String,
);

/// `/api/v3/ticker/24hr` response for a single symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceTicker24h {
    pub symbol: String,
    #[serde(rename = "lastPrice")]
    pub last_price: String,
    #[serde(rename = "bidPrice", skip_serializing_if = "Option::is_none")]
    pub bid_price: Option<String>,
    #[serde(rename = "askPrice", skip_serializing_if = "Option::is_none")]
    pub ask_price: Option<String>,
    #[serde(rename = "highPrice", skip_serializing_if = "Option::is_none")]
    pub high_price: Option<String>,
    #[serde(rename = "lowPrice", skip_serializing_if = "Option::is_none")]
    pub low_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(rename = "quoteVolume", skip_serializing_if = "Option::is_none")]
    pub quote_volume: Option<String>,
    #[serde(rename = "closeTime")]
    pub close_time: i64,
}
