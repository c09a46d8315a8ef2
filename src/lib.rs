//! Candle-history retrieval across cryptocurrency exchanges.
//!
//! [`Exchange`] is the entry point: it wraps one exchange client together
//! with the market snapshot loaded when it was created, and turns
//! `get_candles` calls into as many paginated requests as needed.

pub mod api;
pub mod candles;
pub mod exchange;
pub mod models;

pub use api::{ApiError, Capability, ExchangeClient, SUPPORTED_EXCHANGES};
pub use candles::{CandleError, CandleQuery};
pub use exchange::{Exchange, KlineParams};
pub use models::{Candle, ExchangeSettings, FeeSchedule, MarketData, MarketSnapshot, Ticker};
