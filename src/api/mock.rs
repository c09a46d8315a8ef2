//! Scripted in-memory exchange used by unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::client::{Capability, ExchangeClient, OhlcvRequest, RateLimitConfig};
use super::error::ApiError;
use crate::candles::timeframe::timeframes_to_millis;
use crate::models::{Candle, MarketSnapshot, Ticker};

/// 2024-01-01T00:00:00Z
pub const BASE_TIME_MS: i64 = 1_704_067_200_000;

pub fn mock_market() -> MarketSnapshot {
    let mut market = MarketSnapshot::new("mock", ["1m", "1h", "1d"]);
    market.insert_market("BTC/USDT", "BTCUSDT");
    market.insert_market("ETH/USDT", "ETHUSDT");
    market
}

pub fn candle_at(open_time: i64, duration_ms: i64) -> Candle {
    let price = (open_time / 60_000 % 1_000) as f64;
    Candle {
        open_time,
        open: price,
        high: price + 2.0,
        low: price - 1.0,
        close: price + 1.0,
        volume: 10.0,
        close_time: open_time + duration_ms - 1,
        quote_volume: price * 10.0,
        trade_count: 3,
        taker_buy_base: 5.0,
        taker_buy_quote: price * 5.0,
        ignore: 0.0,
    }
}

enum Behaviour {
    /// Always answer with `n` consecutive candles starting at `since`
    PageSize(usize),
    /// Pop one canned response per call; empty pages once exhausted
    Scripted(Mutex<VecDeque<Result<Vec<Candle>, ApiError>>>),
}

pub struct MockExchange {
    behaviour: Behaviour,
    delay: Option<Duration>,
    requests: Mutex<Vec<OhlcvRequest>>,
}

impl MockExchange {
    pub fn new(responses: Vec<Result<Vec<Candle>, ApiError>>) -> Self {
        Self {
            behaviour: Behaviour::Scripted(Mutex::new(responses.into())),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            behaviour: Behaviour::PageSize(page_size),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<OhlcvRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ExchangeClient for MockExchange {
    fn exchange_name(&self) -> &str {
        "mock"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[
            Capability::FetchOhlcv,
            Capability::FetchTicker,
            Capability::LoadMarkets,
        ]
    }

    async fn load_markets(&self) -> Result<MarketSnapshot, ApiError> {
        Ok(mock_market())
    }

    async fn fetch_ohlcv(&self, request: OhlcvRequest) -> Result<Vec<Candle>, ApiError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behaviour {
            Behaviour::PageSize(page_size) => {
                let duration_ms = timeframes_to_millis(&request.timeframe, 1)
                    .map_err(|e| ApiError::ParseError(e.to_string()))?;
                let since = request.since.unwrap_or(BASE_TIME_MS);
                Ok((0..*page_size as i64)
                    .map(|i| candle_at(since + i * duration_ms, duration_ms))
                    .collect())
            }
            Behaviour::Scripted(responses) => responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new())),
        }
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ApiError> {
        Ok(Ticker {
            symbol: symbol.to_string(),
            last: 100.0,
            bid: Some(99.5),
            ask: Some(100.5),
            high: None,
            low: None,
            base_volume: None,
            quote_volume: None,
            timestamp: BASE_TIME_MS,
        })
    }

    fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_second: 100,
            burst_size: 100,
        }
    }
}
