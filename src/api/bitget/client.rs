use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::api::{
    client::{Capability, ExchangeClient, OhlcvRequest, RateLimitConfig},
    error::ApiError,
    rate_limiter::RateLimiter,
};
use crate::candles::timeframe::timeframes_to_millis;
use crate::models::{Candle, ExchangeSettings, MarketSnapshot, Ticker};

use super::{
    mapper::{bitget_granularity, map_candle_row, map_symbols_to_snapshot, map_ticker},
    types::{BitgetCandleRow, BitgetResponse, BitgetSymbol, BitgetTicker, CandlesRequest},
};

const BASE_URL: &str = "https://api.bitget.com";
const SYMBOLS_ENDPOINT: &str = "/api/v2/spot/public/symbols";
const CANDLES_ENDPOINT: &str = "/api/v2/spot/market/candles";
const TICKERS_ENDPOINT: &str = "/api/v2/spot/market/tickers";
const MAX_CANDLES_PER_REQUEST: u32 = 1000;
const SUCCESS_CODE: &str = "00000";

const CAPABILITIES: &[Capability] = &[
    Capability::FetchOhlcv,
    Capability::FetchTicker,
    Capability::LoadMarkets,
];

const DEFAULT_RATE_LIMIT: RateLimitConfig = RateLimitConfig {
    requests_per_second: 10,
    burst_size: 10,
};

pub struct BitgetClient {
    base_url: String,
    http_client: reqwest::Client,
    rate_limiter: Option<RateLimiter>,
    rate_limit: RateLimitConfig,
}

impl BitgetClient {
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

    /// Rate-limited public GET returning the `data` field of a Bitget envelope
    async fn get<Q, T>(&self, endpoint: &str, query: &Q) -> Result<T, ApiError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        // Rate limit
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        // Make request
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
        if status == 429 {
            return Err(ApiError::RateLimitError(
                "Rate limit exceeded. Please wait before retrying.".to_string(),
            ));
        }

        if status == 401 || status == 403 {
            return Err(ApiError::AuthenticationError(
                "Request rejected by BitGet".to_string(),
            ));
        }

        // Parse response; error statuses still carry the code/msg envelope
        let response_text = response.text().await.map_err(ApiError::from_transport)?;
        let api_response: BitgetResponse<T> = match serde_json::from_str(&response_text) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(ApiError::ExchangeError {
                    code: status.as_u16().to_string(),
                    message: response_text,
                });
            }
            Err(e) => {
                return Err(ApiError::ParseError(format!(
                    "Failed to parse response: {} - Body: {}",
                    e, response_text
                )));
            }
        };

        // Check response code
        if api_response.code != SUCCESS_CODE {
            return Err(ApiError::ExchangeError {
                code: api_response.code,
                message: api_response.msg,
            });
        }

        api_response
            .data
            .ok_or_else(|| ApiError::ParseError("Response data is empty".to_string()))
    }

    /// Bitget answers with the newest candles before `endTime` (default: now),
    /// so a page anchored at `since` must also bound its end
    fn candles_request(&self, request: OhlcvRequest) -> Result<CandlesRequest, ApiError> {
        let granularity =
            bitget_granularity(&request.timeframe).ok_or_else(|| ApiError::UnsupportedOperation {
                exchange: self.exchange_name().to_string(),
                operation: format!("timeframe {}", request.timeframe),
            })?;
        let page_size = request
            .limit
            .unwrap_or(MAX_CANDLES_PER_REQUEST)
            .min(MAX_CANDLES_PER_REQUEST);

        let end_time = match request.since {
            Some(since) => {
                let span = timeframes_to_millis(&request.timeframe, i64::from(page_size))
                    .map_err(|e| ApiError::ParseError(e.to_string()))?;
                let end = since.checked_add(span).ok_or_else(|| {
                    ApiError::ParseError(format!("Page end after {} overflows", since))
                })?;
                Some(end.to_string())
            }
            None => None,
        };

        Ok(CandlesRequest {
            symbol: request.symbol,
            granularity: granularity.to_string(),
            start_time: request.since.map(|ts| ts.to_string()),
            end_time,
            limit: request.limit.map(|_| page_size.to_string()),
            extra: request.params,
        })
    }
}

impl Default for BitgetClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeClient for BitgetClient {
    fn exchange_name(&self) -> &str {
        "bitget"
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    async fn load_markets(&self) -> Result<MarketSnapshot, ApiError> {
        let symbols: Vec<BitgetSymbol> = self.get(SYMBOLS_ENDPOINT, &[("", ""); 0]).await?;
        log::info!("Loaded {} BitGet markets", symbols.len());
        Ok(map_symbols_to_snapshot(&symbols))
    }

    async fn fetch_ohlcv(&self, request: OhlcvRequest) -> Result<Vec<Candle>, ApiError> {
        let duration_ms = timeframes_to_millis(&request.timeframe, 1)
            .map_err(|e| ApiError::ParseError(e.to_string()))?;
        let candles_request = self.candles_request(request)?;

        let rows: Vec<BitgetCandleRow> = self.get(CANDLES_ENDPOINT, &candles_request).await?;

        let mut candles = rows
            .iter()
            .map(|row| map_candle_row(row, duration_ms))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ApiError::ParseError)?;
        candles.sort_by_key(|candle| candle.open_time);

        Ok(candles)
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ApiError> {
        let tickers: Vec<BitgetTicker> = self.get(TICKERS_ENDPOINT, &[("symbol", symbol)]).await?;
        let ticker = tickers
            .first()
            .ok_or_else(|| ApiError::ParseError(format!("No ticker returned for {}", symbol)))?;
        map_ticker(ticker).map_err(ApiError::ParseError)
    }

    fn rate_limit(&self) -> RateLimitConfig {
        self.rate_limit
    }
}
