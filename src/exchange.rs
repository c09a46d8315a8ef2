use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

use crate::api::client::{Capability, ExchangeClient, ExtraParams, KlinesRequest};
use crate::api::error::ApiError;
use crate::api::registry::create_client;
use crate::candles::timeframe::to_exchange_timestamp;
use crate::candles::validator::{
    ensure_capability, ensure_ticker_supported, ensure_timeframe_supported,
};
use crate::candles::{CandleError, CandleQuery, PaginatingFetcher};
use crate::models::{Candle, ExchangeSettings, FeeSchedule, MarketData, MarketSnapshot, Ticker};

/// Bounds for a single raw kline call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KlineParams {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub params: ExtraParams,
}

/// A connected exchange: its client plus the market snapshot loaded at
/// creation. The snapshot is never refreshed.
pub struct Exchange {
    name: String,
    client: Arc<dyn ExchangeClient>,
    market: Arc<MarketSnapshot>,
}

impl Exchange {
    /// Build the client named by `settings` and load its markets
    pub async fn create(settings: &ExchangeSettings) -> Result<Self, ApiError> {
        let client = create_client(settings)?;
        let market = client.load_markets().await?;
        log::info!(
            "Connected to {}: {} symbols, {} timeframes",
            client.exchange_name(),
            market.symbols.len(),
            market.timeframes.len()
        );

        Ok(Self::from_parts(client, market))
    }

    pub fn from_parts(client: Arc<dyn ExchangeClient>, market: MarketSnapshot) -> Self {
        Self {
            name: client.exchange_name().to_string(),
            client,
            market: Arc::new(market),
        }
    }

    /// Name, timeframes and symbols of an exchange, without keeping a connection
    pub async fn load_market_data(settings: &ExchangeSettings) -> Result<MarketData, ApiError> {
        let exchange = Self::create(settings).await?;
        let data = MarketData::from(exchange.market());
        exchange.close();
        Ok(data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn market(&self) -> &MarketSnapshot {
        &self.market
    }

    pub async fn fetch_ticker(&self, ticker: &str) -> Result<Ticker, CandleError> {
        ensure_capability(self.client.as_ref(), Capability::FetchTicker)?;
        ensure_ticker_supported(&self.market, ticker)?;

        self.client
            .fetch_ticker(self.market_id(ticker))
            .await
            .map_err(CandleError::ExchangeRequest)
    }

    /// One unpaginated kline call with explicit bounds
    pub async fn get_klines(
        &self,
        ticker: &str,
        timeframe: &str,
        params: KlineParams,
    ) -> Result<Vec<Candle>, CandleError> {
        ensure_capability(self.client.as_ref(), Capability::RawKlines)?;
        ensure_ticker_supported(&self.market, ticker)?;
        ensure_timeframe_supported(&self.market, timeframe)?;

        let request = KlinesRequest {
            symbol: self.market_id(ticker).to_string(),
            timeframe: timeframe.to_string(),
            start_time: params.start_time.map(to_exchange_timestamp),
            end_time: params.end_time.map(to_exchange_timestamp),
            limit: params.limit,
            params: params.params,
        };
        log::debug!(
            "Raw klines for {} {} (start={:?}, end={:?}, limit={:?})",
            ticker,
            timeframe,
            request.start_time,
            request.end_time,
            request.limit
        );

        self.client
            .fetch_raw_klines(request)
            .await
            .map_err(CandleError::ExchangeRequest)
    }

    pub async fn get_candles(&self, query: CandleQuery) -> Result<Vec<Candle>, CandleError> {
        self.fetcher().fetch(query).await
    }

    pub async fn get_candles_cancellable(
        &self,
        query: CandleQuery,
        cancel: watch::Receiver<bool>,
    ) -> Result<Vec<Candle>, CandleError> {
        self.fetcher().fetch_cancellable(query, cancel).await
    }

    pub fn get_fee(&self) -> FeeSchedule {
        self.client.fee_schedule()
    }

    pub fn close(self) {
        log::info!("Closing {} exchange", self.name);
    }

    fn fetcher(&self) -> PaginatingFetcher {
        PaginatingFetcher::new(self.client.clone(), self.market.clone())
    }

    fn market_id<'a>(&'a self, ticker: &'a str) -> &'a str {
        self.market.market_id(ticker).unwrap_or(ticker)
    }
}
