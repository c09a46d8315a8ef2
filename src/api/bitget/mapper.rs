use super::types::{BitgetCandleRow, BitgetSymbol, BitgetTicker};
use crate::models::{Candle, MarketSnapshot, Ticker};

/// Unified timeframe label -> Bitget spot granularity
const GRANULARITIES: &[(&str, &str)] = &[
    ("1m", "1min"),
    ("3m", "3min"),
    ("5m", "5min"),
    ("15m", "15min"),
    ("30m", "30min"),
    ("1h", "1h"),
    ("4h", "4h"),
    ("6h", "6h"),
    ("12h", "12h"),
    ("1d", "1day"),
    ("3d", "3day"),
    ("1w", "1week"),
    ("1M", "1M"),
];

pub fn bitget_granularity(timeframe: &str) -> Option<&'static str> {
    GRANULARITIES
        .iter()
        .find(|(label, _)| *label == timeframe)
        .map(|(_, granularity)| *granularity)
}

pub fn bitget_timeframes() -> impl Iterator<Item = &'static str> {
    GRANULARITIES.iter().map(|(label, _)| *label)
}

fn parse_field(row: &BitgetCandleRow, index: usize, field: &str) -> Result<f64, String> {
    let value = row
        .get(index)
        .ok_or_else(|| format!("Missing {} (column {})", field, index))?;
    value
        .parse::<f64>()
        .map_err(|e| format!("Invalid {} '{}': {}", field, value, e))
}

fn parse_optional(value: Option<&String>) -> Option<f64> {
    value.and_then(|v| v.parse::<f64>().ok())
}

/// Map a Bitget candle row to the unified Candle.
///
/// Bitget publishes neither close time nor trade counts; close time is
/// derived from the candle duration and the counts stay zero.
pub fn map_candle_row(row: &BitgetCandleRow, duration_ms: i64) -> Result<Candle, String> {
    let open_time = row
        .first()
        .ok_or_else(|| "Empty candle row".to_string())?
        .parse::<i64>()
        .map_err(|e| format!("Invalid timestamp: {}", e))?;

    let close_time = open_time
        .checked_add(duration_ms - 1)
        .ok_or_else(|| format!("Timestamp {} overflows the candle close time", open_time))?;

    // quoteVolume (column 7) is absent on some older payloads; fall back to usdtVolume
    let quote_volume = parse_field(row, 7, "quote volume")
        .or_else(|_| parse_field(row, 6, "usdt volume"))
        .unwrap_or(0.0);

    Ok(Candle {
        open_time,
        open: parse_field(row, 1, "open")?,
        high: parse_field(row, 2, "high")?,
        low: parse_field(row, 3, "low")?,
        close: parse_field(row, 4, "close")?,
        volume: parse_field(row, 5, "base volume")?,
        close_time,
        quote_volume,
        trade_count: 0,
        taker_buy_base: 0.0,
        taker_buy_quote: 0.0,
        ignore: 0.0,
    })
}

/// Build the market snapshot from the public symbol list
pub fn map_symbols_to_snapshot(symbols: &[BitgetSymbol]) -> MarketSnapshot {
    let mut market = MarketSnapshot::new("bitget", bitget_timeframes());
    for symbol in symbols {
        market.insert_market(
            format!("{}/{}", symbol.base_coin, symbol.quote_coin),
            symbol.symbol.clone(),
        );
    }
    market
}

pub fn map_ticker(ticker: &BitgetTicker) -> Result<Ticker, String> {
    let last = ticker
        .last_pr
        .parse::<f64>()
        .map_err(|e| format!("Invalid last price: {}", e))?;
    let timestamp = ticker
        .ts
        .parse::<i64>()
        .map_err(|e| format!("Invalid timestamp: {}", e))?;

    Ok(Ticker {
        symbol: ticker.symbol.clone(),
        last,
        bid: parse_optional(ticker.bid_pr.as_ref()),
        ask: parse_optional(ticker.ask_pr.as_ref()),
        high: parse_optional(ticker.high_24h.as_ref()),
        low: parse_optional(ticker.low_24h.as_ref()),
        base_volume: parse_optional(ticker.base_volume.as_ref()),
        quote_volume: parse_optional(ticker.quote_volume.as_ref()),
        timestamp,
    })
}
