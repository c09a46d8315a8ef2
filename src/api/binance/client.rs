use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::api::{
    client::{Capability, ExchangeClient, ExtraParams, KlinesRequest, OhlcvRequest, RateLimitConfig},
    error::ApiError,
    rate_limiter::RateLimiter,
};
use crate::models::{Candle, ExchangeSettings, MarketSnapshot, Ticker};

use super::{
    mapper::{binance_interval, map_kline_to_candle, map_symbols_to_snapshot, map_ticker},
    types::{BinanceErrorResponse, BinanceExchangeInfo, BinanceKline, BinanceTicker24h},
};

const BASE_URL: &str = "https://api.binance.com";
const EXCHANGE_INFO_ENDPOINT: &str = "/api/v3/exchangeInfo";
const KLINES_ENDPOINT: &str = "/api/v3/klines";
const TICKER_ENDPOINT: &str = "/api/v3/ticker/24hr";
const MAX_KLINES_PER_REQUEST: u32 = 1000;

const CAPABILITIES: &[Capability] = &[
    Capability::FetchOhlcv,
    Capability::FetchTicker,
    Capability::LoadMarkets,
    Capability::RawKlines,
];

// 6000 weight/min at ~5 weight per klines call
const DEFAULT_RATE_LIMIT: RateLimitConfig = RateLimitConfig {
    requests_per_second: 20,
    burst_size: 20,
};

pub struct BinanceClient {
    base_url: String,
    http_client: reqwest::Client,
    rate_limiter: Option<RateLimiter>,
    rate_limit: RateLimitConfig,
}

impl BinanceClient {
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            http_client: reqwest::Client::new(),
            rate_limiter: Some(RateLimiter::new(DEFAULT_RATE_LIMIT)),
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }

    pub fn from_settings(settings: &ExchangeSettings) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;
        let rate_limit = settings.rate_limit_or(DEFAULT_RATE_LIMIT);
        let rate_limiter = settings
            .enable_rate_limit
            .then(|| RateLimiter::new(rate_limit));

        Ok(Self {
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| BASE_URL.to_string()),
            http_client,
            rate_limiter,
            rate_limit,
        })
    }

    fn interval(&self, timeframe: &str) -> Result<&'static str, ApiError> {
        binance_interval(timeframe).ok_or_else(|| ApiError::UnsupportedOperation {
            exchange: self.exchange_name().to_string(),
            operation: format!("timeframe {}", timeframe),
        })
    }

    /// Rate-limited public GET, decoding either the payload or a Binance error body
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<T, ApiError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        // Check status code
        let status = response.status();
        if status == 429 || status == 418 {
            return Err(ApiError::RateLimitError(format!(
                "Binance returned {}. Please wait before retrying.",
                status.as_u16()
            )));
        }

        if status == 401 || status == 403 {
            return Err(ApiError::AuthenticationError(format!(
                "Binance rejected the request with {}",
                status.as_u16()
            )));
        }

        let response_text = response.text().await.map_err(ApiError::from_transport)?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<BinanceErrorResponse>(&response_text) {
                Ok(error) => ApiError::ExchangeError {
                    code: error.code.to_string(),
                    message: error.msg,
                },
                Err(_) => ApiError::ExchangeError {
                    code: status.as_u16().to_string(),
                    message: response_text,
                },
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            ApiError::ParseError(format!(
                "Failed to parse response: {} - Body: {}",
                e, response_text
            ))
        })
    }

    async fn get_klines(
        &self,
        query: Vec<(String, String)>,
        params: &ExtraParams,
    ) -> Result<Vec<Candle>, ApiError> {
        let mut query = query;
        query.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));

        let klines: Vec<BinanceKline> = self.get(KLINES_ENDPOINT, &query).await?;

        let mut candles = klines
            .iter()
            .map(map_kline_to_candle)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ApiError::ParseError)?;
        candles.sort_by_key(|candle| candle.open_time);

        Ok(candles)
    }

    fn klines_query(&self, symbol: &str, timeframe: &str) -> Result<Vec<(String, String)>, ApiError> {
        Ok(vec![
            ("symbol".to_string(), symbol.to_string()),
            ("interval".to_string(), self.interval(timeframe)?.to_string()),
        ])
    }
}

impl Default for BinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    fn exchange_name(&self) -> &str {
        "binance"
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    async fn load_markets(&self) -> Result<MarketSnapshot, ApiError> {
        let info: BinanceExchangeInfo = self.get(EXCHANGE_INFO_ENDPOINT, &[]).await?;
        log::info!("Loaded {} Binance markets", info.symbols.len());
        Ok(map_symbols_to_snapshot(&info.symbols))
    }

    async fn fetch_ohlcv(&self, request: OhlcvRequest) -> Result<Vec<Candle>, ApiError> {
        let mut query = self.klines_query(&request.symbol, &request.timeframe)?;
        if let Some(since) = request.since {
            query.push(("startTime".to_string(), since.to_string()));
        }
        if let Some(limit) = request.limit {
            let limit = limit.min(MAX_KLINES_PER_REQUEST);
            query.push(("limit".to_string(), limit.to_string()));
        }

        self.get_klines(query, &request.params).await
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ApiError> {
        let query = [("symbol".to_string(), symbol.to_string())];
        let ticker: BinanceTicker24h = self.get(TICKER_ENDPOINT, &query).await?;
        map_ticker(&ticker).map_err(ApiError::ParseError)
    }

    async fn fetch_raw_klines(&self, request: KlinesRequest) -> Result<Vec<Candle>, ApiError> {
        let mut query = self.klines_query(&request.symbol, &request.timeframe)?;
        if let Some(start_time) = request.start_time {
            query.push(("startTime".to_string(), start_time.to_string()));
        }
        if let Some(end_time) = request.end_time {
            query.push(("endTime".to_string(), end_time.to_string()));
        }
        if let Some(limit) = request.limit {
            let limit = limit.min(MAX_KLINES_PER_REQUEST);
            query.push(("limit".to_string(), limit.to_string()));
        }

        self.get_klines(query, &request.params).await
    }

    fn rate_limit(&self) -> RateLimitConfig {
        self.rate_limit
    }
}
