use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV interval in the unified 12-field kline layout.
///
/// Timestamps are Unix milliseconds, as exchanged with the venues. Fields an
/// exchange does not publish are zero (or derived, for `close_time`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
    pub quote_volume: f64,
    pub trade_count: u64,
    pub taker_buy_base: f64,
    pub taker_buy_quote: f64,
    pub ignore: f64,
}

impl Candle {
    /// Open time as a calendar timestamp (None if out of chrono's range)
    pub fn open_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.open_time)
    }

    pub fn close_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.close_time)
    }
}
