//! Timeframe labels and the timestamp arithmetic built on them.
//!
//! Durations are in seconds; exchange timestamps are Unix milliseconds.

use chrono::{DateTime, Utc};

use super::error::CandleError;

const MILLIS_PER_SECOND: i64 = 1_000;

/// Seconds per timeframe unit suffix
fn unit_seconds(unit: &str) -> Option<i64> {
    match unit {
        "s" => Some(1),
        "m" => Some(60),
        "h" => Some(3_600),
        "d" => Some(86_400),
        "w" => Some(604_800),
        "M" => Some(2_592_000),
        "y" => Some(31_536_000),
        _ => None,
    }
}

fn unknown(timeframe: &str) -> CandleError {
    CandleError::UnknownTimeframe {
        timeframe: timeframe.to_string(),
    }
}

fn overflow(what: &str) -> CandleError {
    CandleError::InvalidArgument(format!("{} overflows a 64-bit timestamp", what))
}

/// Duration of one candle, e.g. `"15m"` -> 900
pub fn timeframe_duration_seconds(timeframe: &str) -> Result<i64, CandleError> {
    let split = timeframe
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| unknown(timeframe))?;
    let (amount, unit) = timeframe.split_at(split);

    let amount: i64 = if amount.is_empty() {
        1
    } else {
        amount.parse().map_err(|_| unknown(timeframe))?
    };
    let unit = unit_seconds(unit).ok_or_else(|| unknown(timeframe))?;

    match amount.checked_mul(unit) {
        Some(seconds) if seconds > 0 => Ok(seconds),
        _ => Err(unknown(timeframe)),
    }
}

/// `count` candles expressed in seconds
pub fn timeframes_to_seconds(timeframe: &str, count: i64) -> Result<i64, CandleError> {
    if count < 0 {
        return Err(CandleError::InvalidArgument(format!(
            "candle count must not be negative, got {}",
            count
        )));
    }
    let duration = timeframe_duration_seconds(timeframe)?;
    count
        .checked_mul(duration)
        .ok_or_else(|| overflow("candle span"))
}

/// `count` candles expressed in milliseconds, for offsetting exchange timestamps
pub fn timeframes_to_millis(timeframe: &str, count: i64) -> Result<i64, CandleError> {
    timeframes_to_seconds(timeframe, count)?
        .checked_mul(MILLIS_PER_SECOND)
        .ok_or_else(|| overflow("candle span"))
}

/// Month and year candles follow the calendar, so their nominal 30/365-day
/// length can overshoot the next open time
fn has_calendar_length(timeframe: &str) -> bool {
    timeframe.ends_with('M') || timeframe.ends_with('y')
}

/// Offset from the last received open time to the next page's `since`.
///
/// One candle for fixed-length timeframes; one millisecond for calendar ones,
/// leaving the exchange to pick the next calendar boundary.
pub fn page_advance_millis(timeframe: &str) -> Result<i64, CandleError> {
    let step_ms = timeframes_to_millis(timeframe, 1)?;
    if has_calendar_length(timeframe) {
        Ok(1)
    } else {
        Ok(step_ms)
    }
}

/// Number of candles needed to cover `[start_time, end_time)`, rounded up
pub fn range_length_in_candles(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    timeframe: &str,
) -> Result<u64, CandleError> {
    let start_ms = to_exchange_timestamp(start_time);
    let end_ms = to_exchange_timestamp(end_time);
    if end_ms <= start_ms {
        return Err(CandleError::InvalidRange { start_ms, end_ms });
    }

    let duration_ms = timeframes_to_millis(timeframe, 1)?;
    let span = end_ms
        .checked_sub(start_ms)
        .ok_or_else(|| overflow("time range"))?;

    // span > 0 and duration_ms > 0, so this is at least 1
    let candles = span / duration_ms + i64::from(span % duration_ms != 0);
    Ok(candles as u64)
}

/// Calendar timestamp to the millisecond epoch form exchanges expect
pub fn to_exchange_timestamp(datetime: DateTime<Utc>) -> i64 {
    datetime.timestamp_millis()
}
