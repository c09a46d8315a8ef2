use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Symbols and timeframes one exchange instance accepts.
///
/// Loaded once when the exchange is created and read-only afterwards.
/// Symbols are unified `BASE/QUOTE` tickers; `market_ids` maps each one to
/// the identifier the venue expects on the wire (e.g. `BTC/USDT` -> `BTCUSDT`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub exchange: String,
    pub symbols: BTreeSet<String>,
    pub market_ids: BTreeMap<String, String>,
    pub timeframes: BTreeSet<String>,
}

impl MarketSnapshot {
    pub fn new<I, S>(exchange: impl Into<String>, timeframes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exchange: exchange.into(),
            symbols: BTreeSet::new(),
            market_ids: BTreeMap::new(),
            timeframes: timeframes.into_iter().map(Into::into).collect(),
        }
    }

    /// Register a tradable market under its unified symbol
    pub fn insert_market(&mut self, symbol: impl Into<String>, market_id: impl Into<String>) {
        let symbol = symbol.into();
        self.symbols.insert(symbol.clone());
        self.market_ids.insert(symbol, market_id.into());
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn has_timeframe(&self, timeframe: &str) -> bool {
        self.timeframes.contains(timeframe)
    }

    /// Venue-specific id for a unified symbol
    pub fn market_id(&self, symbol: &str) -> Option<&str> {
        self.market_ids.get(symbol).map(String::as_str)
    }
}

/// One-shot market metadata summary for an exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub name: String,
    pub timeframes: Vec<String>,
    pub symbols: Vec<String>,
}

impl From<&MarketSnapshot> for MarketData {
    fn from(snapshot: &MarketSnapshot) -> Self {
        Self {
            name: snapshot.exchange.clone(),
            timeframes: snapshot.timeframes.iter().cloned().collect(),
            symbols: snapshot.symbols.iter().cloned().collect(),
        }
    }
}

/// Latest quote for a single market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub last: f64,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub base_volume: Option<f64>,
    pub quote_volume: Option<f64>,
    pub timestamp: i64, // Unix milliseconds
}

/// Taker/maker fee rates as fractions (0.001 = 0.1%)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub taker: f64,
    pub maker: f64,
}

impl FeeSchedule {
    /// Static fee table keyed by exchange name
    pub fn for_exchange(name: &str) -> Self {
        match name {
            "kraken" => Self {
                taker: 0.0016,
                maker: 0.0032,
            },
            "binance" => Self {
                taker: 0.0010,
                maker: 0.0020,
            },
            _ => Self {
                taker: 0.0015,
                maker: 0.0030,
            },
        }
    }
}
