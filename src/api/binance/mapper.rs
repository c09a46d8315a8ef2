use super::types::{BinanceKline, BinanceSymbol, BinanceTicker24h};
use crate::models::{Candle, MarketSnapshot, Ticker};

/// Timeframe labels Binance spot klines accept (labels are used verbatim)
pub const BINANCE_TIMEFRAMES: &[&str] = &[
    "1s", "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w",
    "1M",
];

/// Binance kline interval for a unified timeframe label
pub fn binance_interval(timeframe: &str) -> Option<&'static str> {
    BINANCE_TIMEFRAMES
        .iter()
        .find(|label| **label == timeframe)
        .copied()
}

fn parse_decimal(field: &str, value: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .map_err(|e| format!("Invalid {} '{}': {}", field, value, e))
}

fn parse_optional(value: Option<&String>) -> Option<f64> {
    value.and_then(|v| v.parse::<f64>().ok())
}

/// Map a Binance kline row to the unified Candle
pub fn map_kline_to_candle(kline: &BinanceKline) -> Result<Candle, String> {
    Ok(Candle {
        open_time: kline.0,
        open: parse_decimal("open", &kline.1)?,
        high: parse_decimal("high", &kline.2)?,
        low: parse_decimal("low", &kline.3)?,
        close: parse_decimal("close", &kline.4)?,
        volume: parse_decimal("volume", &kline.5)?,
        close_time: kline.6,
        quote_volume: parse_decimal("quote volume", &kline.7)?,
        trade_count: kline.8,
        taker_buy_base: parse_decimal("taker buy base volume", &kline.9)?,
        taker_buy_quote: parse_decimal("taker buy quote volume", &kline.10)?,
        // Binance documents this column as unused; tolerate anything non-numeric
        ignore: kline.11.parse::<f64>().unwrap_or(0.0),
    })
}

/// Symbol status for markets that currently accept orders and publish klines
const TRADING_STATUS: &str = "TRADING";

/// Build the market snapshot from exchangeInfo symbols. Halted and delisted
/// symbols are left out.
pub fn map_symbols_to_snapshot(symbols: &[BinanceSymbol]) -> MarketSnapshot {
    let mut market = MarketSnapshot::new("binance", BINANCE_TIMEFRAMES.iter().copied());
    for symbol in symbols.iter().filter(|s| s.status == TRADING_STATUS) {
        market.insert_market(
            format!("{}/{}", symbol.base_asset, symbol.quote_asset),
            symbol.symbol.clone(),
        );
    }
    market
}

pub fn map_ticker(ticker: &BinanceTicker24h) -> Result<Ticker, String> {
    Ok(Ticker {
        symbol: ticker.symbol.clone(),
        last: parse_decimal("last price", &ticker.last_price)?,
        bid: parse_optional(ticker.bid_price.as_ref()),
        ask: parse_optional(ticker.ask_price.as_ref()),
        high: parse_optional(ticker.high_price.as_ref()),
        low: parse_optional(ticker.low_price.as_ref()),
        base_volume: parse_optional(ticker.volume.as_ref()),
        quote_volume: parse_optional(ticker.quote_volume.as_ref()),
        timestamp: ticker.close_time,
    })
}
