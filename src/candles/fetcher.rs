use std::sync::Arc;
use tokio::sync::watch;

use crate::api::client::{Capability, ExchangeClient, OhlcvRequest};
use crate::models::{Candle, MarketSnapshot};

use super::error::CandleError;
use super::planner::{PagePlan, plan_first_page};
use super::query::CandleQuery;
use super::timeframe::page_advance_millis;
use super::validator::{ensure_capability, ensure_ticker_supported, ensure_timeframe_supported};

/// Working state of one fetch operation. Never shared between operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestPlan {
    /// Open time (Unix ms) the next page starts from
    pub since: Option<i64>,
    /// Candles still wanted; None means a single untracked page
    pub remaining_limit: Option<u32>,
    pub candles: Vec<Candle>,
}

impl RequestPlan {
    pub fn new(first_page: PagePlan) -> Self {
        Self {
            since: first_page.since,
            remaining_limit: first_page.limit,
            candles: Vec::new(),
        }
    }

    /// Append up to `max` candles from `page`, skipping any that do not
    /// advance past the last accumulated open time. Returns how many were kept.
    fn merge_page(&mut self, page: Vec<Candle>, max: u32) -> u32 {
        let mut accepted = 0;
        let mut skipped = 0;

        for candle in page {
            if accepted >= max {
                break;
            }
            let advances = self
                .candles
                .last()
                .is_none_or(|last| candle.open_time > last.open_time);
            if advances {
                self.candles.push(candle);
                accepted += 1;
            } else {
                skipped += 1;
            }
        }

        if skipped > 0 {
            log::warn!(
                "Dropped {} candles overlapping already fetched data",
                skipped
            );
        }

        accepted
    }
}

/// Drives sequential page requests until the requested span is covered.
///
/// Pages are fetched strictly one after another: the `since` of each page
/// depends on the last candle of the previous one.
#[derive(Clone)]
pub struct PaginatingFetcher {
    client: Arc<dyn ExchangeClient>,
    market: Arc<MarketSnapshot>,
}

impl PaginatingFetcher {
    pub fn new(client: Arc<dyn ExchangeClient>, market: Arc<MarketSnapshot>) -> Self {
        Self { client, market }
    }

    /// Fetch the candles described by `query`, merged into one ascending series
    pub async fn fetch(&self, query: CandleQuery) -> Result<Vec<Candle>, CandleError> {
        self.run(query, None).await
    }

    /// Like [`fetch`](Self::fetch), but gives up with [`CandleError::Cancelled`]
    /// as soon as `cancel` holds `true`
    pub async fn fetch_cancellable(
        &self,
        query: CandleQuery,
        cancel: watch::Receiver<bool>,
    ) -> Result<Vec<Candle>, CandleError> {
        self.run(query, Some(cancel)).await
    }

    /// Validation and first-page planning; no I/O happens here
    fn prepare(&self, query: &CandleQuery) -> Result<(String, i64, PagePlan), CandleError> {
        ensure_capability(self.client.as_ref(), Capability::FetchOhlcv)?;
        ensure_ticker_supported(&self.market, &query.ticker)?;
        ensure_timeframe_supported(&self.market, &query.timeframe)?;

        let step_ms = page_advance_millis(&query.timeframe)?;
        let first_page = plan_first_page(
            &query.timeframe,
            query.start_time,
            query.end_time,
            query.limit,
        )?;
        let market_id = self
            .market
            .market_id(&query.ticker)
            .unwrap_or(query.ticker.as_str())
            .to_string();

        Ok((market_id, step_ms, first_page))
    }

    async fn run(
        &self,
        query: CandleQuery,
        mut cancel: Option<watch::Receiver<bool>>,
    ) -> Result<Vec<Candle>, CandleError> {
        let (market_id, step_ms, first_page) = self.prepare(&query)?;
        let mut plan = RequestPlan::new(first_page);

        if plan.remaining_limit == Some(0) {
            log::debug!("Zero-candle request for {}, nothing to fetch", query.ticker);
            return Ok(plan.candles);
        }

        let mut page_number = 0u32;
        loop {
            if cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
                return Err(CandleError::Cancelled);
            }

            page_number += 1;
            let request = OhlcvRequest {
                symbol: market_id.clone(),
                timeframe: query.timeframe.clone(),
                since: plan.since,
                limit: plan.remaining_limit,
                params: query.params.clone(),
            };
            log::debug!(
                "Requesting {} {} page {} (since={:?}, limit={:?})",
                query.ticker,
                query.timeframe,
                page_number,
                request.since,
                request.limit
            );

            let page = self.fetch_page(request, cancel.as_mut()).await?;
            log::debug!("Page {} returned {} candles", page_number, page.len());

            let Some(remaining) = plan.remaining_limit else {
                // Untracked mode is always exactly one page
                plan.candles.extend(page);
                break;
            };

            if page.is_empty() {
                log::debug!(
                    "Exchange has no more {} data, stopping with {} candles still wanted",
                    query.ticker,
                    remaining
                );
                break;
            }

            let accepted = plan.merge_page(page, remaining);
            if accepted == 0 {
                log::warn!(
                    "Page {} for {} contained no new candles, stopping",
                    page_number,
                    query.ticker
                );
                break;
            }

            let remaining = remaining - accepted;
            plan.remaining_limit = Some(remaining);
            if remaining == 0 {
                break;
            }

            if let Some(last) = plan.candles.last() {
                let next_since = last.open_time.checked_add(step_ms).ok_or_else(|| {
                    CandleError::InvalidArgument(format!(
                        "next page start after {} overflows",
                        last.open_time
                    ))
                })?;
                plan.since = Some(next_since);
            }
        }

        log::debug!(
            "Fetched {} {} candles for {} in {} requests",
            plan.candles.len(),
            query.timeframe,
            query.ticker,
            page_number
        );
        Ok(plan.candles)
    }

    async fn fetch_page(
        &self,
        request: OhlcvRequest,
        cancel: Option<&mut watch::Receiver<bool>>,
    ) -> Result<Vec<Candle>, CandleError> {
        let page = self.client.fetch_ohlcv(request);
        let result = match cancel {
            Some(cancel) => tokio::select! {
                result = page => result,
                _ = cancelled(cancel) => return Err(CandleError::Cancelled),
            },
            None => page.await,
        };
        result.map_err(CandleError::ExchangeRequest)
    }
}

/// Resolves once the flag turns true; never if the sender goes away first
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let sender_gone = cancel.wait_for(|flag| *flag).await.is_err();
    if sender_gone {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use crate::api::mock::{BASE_TIME_MS, MockExchange, candle_at, mock_market};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::error::Error as _;

    const HOUR_MS: i64 = 3_600_000;
    const MINUTE_MS: i64 = 60_000;

    fn fetcher(mock: &Arc<MockExchange>) -> PaginatingFetcher {
        PaginatingFetcher::new(mock.clone(), Arc::new(mock_market()))
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn candles(from: i64, count: i64, step_ms: i64) -> Vec<Candle> {
        (0..count)
            .map(|i| candle_at(from + i * step_ms, step_ms))
            .collect()
    }

    fn assert_strictly_increasing(candles: &[Candle]) {
        for pair in candles.windows(2) {
            assert!(
                pair[0].open_time < pair[1].open_time,
                "{} !< {}",
                pair[0].open_time,
                pair[1].open_time
            );
        }
    }

    #[tokio::test]
    async fn test_two_per_call_exchange_merges_three_pages() {
        let mock = Arc::new(MockExchange::with_page_size(2));
        let query = CandleQuery::new("BTC/USDT", "1h").start(start()).limit(5);

        let result = fetcher(&mock).fetch(query).await.unwrap();

        assert_eq!(result.len(), 5);
        assert_strictly_increasing(&result);

        let requests = mock.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(
            requests.iter().map(|r| r.limit).collect::<Vec<_>>(),
            vec![Some(5), Some(3), Some(1)]
        );
        assert_eq!(requests[0].since, Some(BASE_TIME_MS));
        assert_eq!(requests[0].symbol, "BTCUSDT");
        // Each page starts two candles after the previous page's first candle
        for k in 0..2 {
            let first_open = result[k * 2].open_time;
            assert_eq!(requests[k + 1].since, Some(first_open + 2 * HOUR_MS));
        }
    }

    #[tokio::test]
    async fn test_monthly_pages_follow_calendar_months() {
        let month_open = |month: u32| {
            Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0)
                .unwrap()
                .timestamp_millis()
        };
        let month_ms = 30 * 24 * HOUR_MS;
        let mock = Arc::new(MockExchange::new(vec![
            Ok(vec![
                candle_at(month_open(1), month_ms),
                candle_at(month_open(2), month_ms),
            ]),
            Ok(vec![candle_at(month_open(3), month_ms)]),
        ]));
        let mut market = MarketSnapshot::new("mock", ["1M"]);
        market.insert_market("BTC/USDT", "BTCUSDT");
        let fetcher = PaginatingFetcher::new(mock.clone(), Arc::new(market));

        let result = fetcher
            .fetch(CandleQuery::new("BTC/USDT", "1M").start(start()).limit(3))
            .await
            .unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result[2].open_time, month_open(3));
        // February is 29 days long; a fixed 30-day step would skip 1 March
        let requests = mock.requests();
        assert_eq!(requests[1].since, Some(month_open(2) + 1));
        assert!(requests[1].since < Some(month_open(3)));
    }

    #[tokio::test]
    async fn test_empty_page_ends_without_error() {
        let mock = Arc::new(MockExchange::new(vec![
            Ok(candles(BASE_TIME_MS, 3, MINUTE_MS)),
            Ok(Vec::new()),
            Ok(candles(BASE_TIME_MS + 10 * MINUTE_MS, 3, MINUTE_MS)),
        ]));
        let query = CandleQuery::new("BTC/USDT", "1m").start(start()).limit(100);

        let result = fetcher(&mock).fetch(query).await.unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_zero_limit_makes_no_calls() {
        let mock = Arc::new(MockExchange::with_page_size(2));
        let query = CandleQuery::new("BTC/USDT", "1h").limit(0);

        let result = fetcher(&mock).fetch(query).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_timeframe_makes_no_calls() {
        let mock = Arc::new(MockExchange::with_page_size(2));

        let err = fetcher(&mock)
            .fetch(CandleQuery::new("BTC/USDT", "2h").limit(10))
            .await
            .unwrap_err();

        assert!(matches!(err, CandleError::InvalidTimeframe { ref timeframe } if timeframe == "2h"));
        assert!(err.is_validation());
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_ticker_makes_no_calls() {
        let mock = Arc::new(MockExchange::with_page_size(2));

        let err = fetcher(&mock)
            .fetch(CandleQuery::new("XRP/BTC", "1h"))
            .await
            .unwrap_err();

        assert!(matches!(err, CandleError::InvalidTicker { .. }));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_reversed_window_makes_no_calls() {
        let mock = Arc::new(MockExchange::with_page_size(2));
        let query = CandleQuery::new("BTC/USDT", "1h")
            .start(start())
            .end(start() - Duration::hours(2));

        let err = fetcher(&mock).fetch(query).await.unwrap_err();

        assert!(matches!(err, CandleError::InvalidRange { .. }));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_bounded_window_fetches_range_length() {
        let mock = Arc::new(MockExchange::with_page_size(4));
        let query = CandleQuery::new("ETH/USDT", "1h")
            .start(start())
            .end(start() + Duration::hours(10));

        let result = fetcher(&mock).fetch(query).await.unwrap();

        assert_eq!(result.len(), 10);
        assert_eq!(result[0].open_time, BASE_TIME_MS);
        assert_eq!(result[9].open_time, BASE_TIME_MS + 9 * HOUR_MS);
        assert_eq!(
            mock.requests().iter().map(|r| r.limit).collect::<Vec<_>>(),
            vec![Some(10), Some(6), Some(2)]
        );
    }

    #[tokio::test]
    async fn test_end_and_limit_start_from_counted_back_time() {
        let mock = Arc::new(MockExchange::with_page_size(50));
        let end = start() + Duration::hours(24);
        let query = CandleQuery::new("BTC/USDT", "1h").end(end).limit(6);

        let result = fetcher(&mock).fetch(query).await.unwrap();

        assert_eq!(result.len(), 6);
        assert_eq!(mock.requests()[0].since, Some(BASE_TIME_MS + 18 * HOUR_MS));
        assert_eq!(result[5].open_time, BASE_TIME_MS + 23 * HOUR_MS);
    }

    #[tokio::test]
    async fn test_untracked_request_is_a_single_page() {
        let mock = Arc::new(MockExchange::with_page_size(7));

        let result = fetcher(&mock)
            .fetch(CandleQuery::new("BTC/USDT", "1d"))
            .await
            .unwrap();

        assert_eq!(result.len(), 7);
        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].since, None);
        assert_eq!(requests[0].limit, None);
    }

    #[tokio::test]
    async fn test_oversized_page_is_truncated_to_limit() {
        let mock = Arc::new(MockExchange::with_page_size(10));
        let query = CandleQuery::new("BTC/USDT", "1m").start(start()).limit(4);

        let result = fetcher(&mock).fetch(query).await.unwrap();

        assert_eq!(result.len(), 4);
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_pages_are_deduplicated() {
        let mock = Arc::new(MockExchange::new(vec![
            Ok(candles(BASE_TIME_MS, 3, MINUTE_MS)),
            Ok(candles(BASE_TIME_MS + 2 * MINUTE_MS, 3, MINUTE_MS)),
        ]));
        let query = CandleQuery::new("BTC/USDT", "1m").start(start()).limit(10);

        let result = fetcher(&mock).fetch(query).await.unwrap();

        assert_eq!(result.len(), 5);
        assert_strictly_increasing(&result);
        let requests = mock.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].since, Some(BASE_TIME_MS + 3 * MINUTE_MS));
        assert_eq!(requests[1].limit, Some(7));
        assert_eq!(requests[2].limit, Some(5));
    }

    #[tokio::test]
    async fn test_page_without_new_candles_stops_the_loop() {
        let mock = Arc::new(MockExchange::new(vec![
            Ok(candles(BASE_TIME_MS, 3, MINUTE_MS)),
            Ok(candles(BASE_TIME_MS, 3, MINUTE_MS)),
            Ok(candles(BASE_TIME_MS, 3, MINUTE_MS)),
        ]));
        let query = CandleQuery::new("BTC/USDT", "1m").start(start()).limit(50);

        let result = fetcher(&mock).fetch(query).await.unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_exchange_failure_discards_partial_result() {
        let mock = Arc::new(MockExchange::new(vec![
            Ok(candles(BASE_TIME_MS, 2, MINUTE_MS)),
            Err(ApiError::NetworkError("connection reset".to_string())),
        ]));
        let query = CandleQuery::new("BTC/USDT", "1m").start(start()).limit(10);

        let err = fetcher(&mock).fetch(query).await.unwrap_err();

        assert!(matches!(err, CandleError::ExchangeRequest(ApiError::NetworkError(_))));
        assert!(!err.is_validation());
        assert!(err.source().is_some());
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_identical_queries_yield_identical_series() {
        let mock = Arc::new(MockExchange::with_page_size(3));
        let fetcher = fetcher(&mock);
        let query = CandleQuery::new("ETH/USDT", "1m").start(start()).limit(8);

        let first = fetcher.fetch(query.clone()).await.unwrap();
        let second = fetcher.fetch(query).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.calls(), 6);
    }

    #[tokio::test]
    async fn test_params_are_per_call() {
        let mock = Arc::new(MockExchange::with_page_size(2));
        let fetcher = fetcher(&mock);

        fetcher
            .fetch(CandleQuery::new("BTC/USDT", "1m").limit(1).param("timeZone", "8"))
            .await
            .unwrap();
        fetcher
            .fetch(CandleQuery::new("BTC/USDT", "1m").limit(1))
            .await
            .unwrap();

        let requests = mock.requests();
        assert_eq!(requests[0].params.get("timeZone").map(String::as_str), Some("8"));
        assert!(requests[1].params.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_fetches_do_not_share_state() {
        let mock = Arc::new(MockExchange::with_page_size(2));
        let fetcher = fetcher(&mock);

        let (btc, eth) = futures::future::join(
            fetcher.fetch(CandleQuery::new("BTC/USDT", "1m").start(start()).limit(5)),
            fetcher.fetch(
                CandleQuery::new("ETH/USDT", "1h")
                    .start(start() + Duration::days(1))
                    .limit(3),
            ),
        )
        .await;

        let btc = btc.unwrap();
        let eth = eth.unwrap();
        assert_eq!(btc.len(), 5);
        assert_eq!(eth.len(), 3);
        assert_eq!(btc[0].open_time, BASE_TIME_MS);
        assert_eq!(eth[0].open_time, BASE_TIME_MS + 24 * HOUR_MS);
        assert_strictly_increasing(&btc);
        assert_strictly_increasing(&eth);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_page() {
        let mock = Arc::new(MockExchange::with_page_size(2).with_delay(std::time::Duration::from_secs(30)));
        let (tx, rx) = watch::channel(false);
        let query = CandleQuery::new("BTC/USDT", "1m").start(start()).limit(10);

        let cancel = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            tx.send(true).ok();
            tx
        });

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            fetcher(&mock).fetch_cancellable(query, rx),
        )
        .await
        .expect("cancellation should interrupt the in-flight page");

        assert!(matches!(result, Err(CandleError::Cancelled)));
        cancel.await.unwrap();
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_calls() {
        let mock = Arc::new(MockExchange::with_page_size(2));
        let (_tx, rx) = watch::channel(true);

        let result = fetcher(&mock)
            .fetch_cancellable(CandleQuery::new("BTC/USDT", "1m").limit(3), rx)
            .await;

        assert!(matches!(result, Err(CandleError::Cancelled)));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_dropped_sender_does_not_cancel() {
        let mock = Arc::new(MockExchange::with_page_size(2));
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let result = fetcher(&mock)
            .fetch_cancellable(CandleQuery::new("BTC/USDT", "1m").limit(3), rx)
            .await
            .unwrap();

        assert_eq!(result.len(), 3);
    }
}
