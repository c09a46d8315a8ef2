use chrono::{DateTime, Utc};

use crate::api::client::ExtraParams;

/// Everything one `get_candles` call needs, passed once per call.
///
/// `params` is owned by the query, so no parameter map is ever shared
/// between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleQuery {
    /// Unified ticker (e.g., "BTC/USDT")
    pub ticker: String,
    /// Timeframe label (e.g., "1h")
    pub timeframe: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub params: ExtraParams,
}

impl CandleQuery {
    pub fn new(ticker: impl Into<String>, timeframe: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            timeframe: timeframe.into(),
            start_time: None,
            end_time: None,
            limit: None,
            params: ExtraParams::new(),
        }
    }

    pub fn start(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn end(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}
