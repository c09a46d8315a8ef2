//! Candle-history retrieval: validation, first-page planning and paginated
//! fetching on top of any [`ExchangeClient`](crate::api::ExchangeClient).

pub mod error;
pub mod fetcher;
pub mod planner;
pub mod query;
pub mod timeframe;
pub mod validator;

pub use error::CandleError;
pub use fetcher::{PaginatingFetcher, RequestPlan};
pub use planner::{PagePlan, plan_first_page};
pub use query::CandleQuery;
pub use timeframe::{
    page_advance_millis, range_length_in_candles, timeframe_duration_seconds, timeframes_to_millis,
    timeframes_to_seconds, to_exchange_timestamp,
};
