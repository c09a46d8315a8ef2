pub mod binance;
pub mod bitget;
pub mod client;
pub mod error;
#[cfg(test)]
pub(crate) mod mock;
pub mod rate_limiter;
pub mod registry;

pub use client::{
    Capability, ExchangeClient, ExtraParams, KlinesRequest, OhlcvRequest, RateLimitConfig,
};
pub use error::ApiError;
pub use rate_limiter::RateLimiter;
pub use registry::{SUPPORTED_EXCHANGES, create_client};
