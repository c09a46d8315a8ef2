use std::sync::Arc;

use super::binance::BinanceClient;
use super::bitget::BitgetClient;
use super::client::ExchangeClient;
use super::error::ApiError;
use crate::models::ExchangeSettings;

/// Exchange names accepted by [`create_client`]
pub const SUPPORTED_EXCHANGES: &[&str] = &["binance", "bitget"];

/// Build the client for `settings.exchange` (case-insensitive)
pub fn create_client(settings: &ExchangeSettings) -> Result<Arc<dyn ExchangeClient>, ApiError> {
    match settings.exchange.to_lowercase().as_str() {
        "binance" => Ok(Arc::new(BinanceClient::from_settings(settings)?)),
        "bitget" => Ok(Arc::new(BitgetClient::from_settings(settings)?)),
        _ => Err(ApiError::ExchangeNotFound {
            name: settings.exchange.clone(),
        }),
    }
}
