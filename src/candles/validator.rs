//! Pre-flight checks. All of them run before any network I/O.

use crate::api::client::{Capability, ExchangeClient};
use crate::models::MarketSnapshot;

use super::error::CandleError;

pub fn ensure_ticker_supported(market: &MarketSnapshot, ticker: &str) -> Result<(), CandleError> {
    if market.has_symbol(ticker) {
        Ok(())
    } else {
        Err(CandleError::InvalidTicker {
            exchange: market.exchange.clone(),
            ticker: ticker.to_string(),
        })
    }
}

pub fn ensure_timeframe_supported(
    market: &MarketSnapshot,
    timeframe: &str,
) -> Result<(), CandleError> {
    if market.has_timeframe(timeframe) {
        Ok(())
    } else {
        Err(CandleError::InvalidTimeframe {
            timeframe: timeframe.to_string(),
        })
    }
}

pub fn ensure_capability(
    client: &dyn ExchangeClient,
    capability: Capability,
) -> Result<(), CandleError> {
    if client.has_capability(capability) {
        Ok(())
    } else {
        Err(CandleError::UnsupportedCapability { capability })
    }
}

/// Capability check by snake_case operation name (e.g. `"fetch_ohlcv"`)
pub fn ensure_capability_named(
    client: &dyn ExchangeClient,
    capability_name: &str,
) -> Result<Capability, CandleError> {
    let capability = capability_name.parse::<Capability>().map_err(|name| {
        CandleError::InvalidArgument(format!("unknown capability name: {}", name))
    })?;
    ensure_capability(client, capability)?;
    Ok(capability)
}
