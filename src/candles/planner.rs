use chrono::{DateTime, Utc};

use super::error::CandleError;
use super::timeframe::{range_length_in_candles, timeframes_to_millis, to_exchange_timestamp};

/// `since`/`limit` for the first page of a candle request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePlan {
    /// Unix milliseconds; None lets the exchange return its most recent candles
    pub since: Option<i64>,
    /// None delegates the page size to the exchange default
    pub limit: Option<u32>,
}

/// Derive the initial request parameters from an optional window and count.
///
/// First matching rule wins:
/// - start and end: since = start, limit capped to the candles the window holds
/// - end and limit only: since = end minus `limit` candles
/// - start only: since = start, limit unchanged
/// - otherwise: no since, limit unchanged
pub fn plan_first_page(
    timeframe: &str,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    limit: Option<u32>,
) -> Result<PagePlan, CandleError> {
    match (start_time, end_time, limit) {
        (Some(start), Some(end), limit) => {
            let in_range = range_length_in_candles(start, end, timeframe)?;
            let range_limit = u32::try_from(in_range).unwrap_or(u32::MAX);
            let limit = match limit {
                Some(limit) if limit <= range_limit => limit,
                _ => range_limit,
            };
            Ok(PagePlan {
                since: Some(to_exchange_timestamp(start)),
                limit: Some(limit),
            })
        }
        (None, Some(end), Some(limit)) => {
            let span = timeframes_to_millis(timeframe, i64::from(limit))?;
            let since = to_exchange_timestamp(end).checked_sub(span).ok_or_else(|| {
                CandleError::InvalidArgument(format!(
                    "{} candles before {} underflows the timestamp range",
                    limit, end
                ))
            })?;
            Ok(PagePlan {
                since: Some(since),
                limit: Some(limit),
            })
        }
        (Some(start), None, limit) => Ok(PagePlan {
            since: Some(to_exchange_timestamp(start)),
            limit,
        }),
        (None, _, limit) => Ok(PagePlan { since: None, limit }),
    }
}
