use analysis_core::{AnalysisError, Bar, PriceDataProvider};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://api.polygon.io";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(15);

/// Admits at most `capacity` calls in any rolling `period`.
#[derive(Clone)]
struct Throttle {
    issued: Arc<Mutex<VecDeque<Instant>>>,
    capacity: usize,
    period: Duration,
}

impl Throttle {
    fn per_minute(capacity: usize) -> Self {
        Self {
            issued: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
            period: Duration::from_secs(60),
        }
    }

    async fn wait_for_slot(&self) {
        loop {
            let mut issued = self.issued.lock().await;
            let now = Instant::now();
            issued.retain(|&at| now.duration_since(at) < self.period);

            let wait = match issued.front() {
                Some(&oldest) if issued.len() >= self.capacity => {
                    (oldest + self.period).saturating_duration_since(now) + Duration::from_millis(50)
                }
                _ => {
                    issued.push_back(now);
                    return;
                }
            };
            drop(issued);

            tracing::debug!("Polygon throttle full, sleeping {:.1}s", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }
    }
}

/// Polygon.io REST client used as the price collaborator.
#[derive(Clone)]
pub struct PolygonClient {
    api_key: String,
    http: Client,
    throttle: Throttle,
}

impl PolygonClient {
    /// `requests_per_minute` is 5 on the free tier, 500 on Starter.
    pub fn new(api_key: String, requests_per_minute: usize) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            http,
            throttle: Throttle::per_minute(requests_per_minute),
        }
    }

    /// Throttled send; a 429 backs off and retries up to `MAX_ATTEMPTS` times.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, AnalysisError> {
        let request = builder
            .query(&[("apiKey", self.api_key.as_str())])
            .build()
            .map_err(|e| AnalysisError::UpstreamFailure(e.to_string()))?;

        for attempt in 1..=MAX_ATTEMPTS {
            self.throttle.wait_for_slot().await;
            let Some(attempt_request) = request.try_clone() else {
                return Err(AnalysisError::UpstreamFailure("request body is not clonable".to_string()));
            };
            let response = self
                .http
                .execute(attempt_request)
                .await
                .map_err(|e| AnalysisError::UpstreamFailure(e.to_string()))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }
            tracing::warn!(
                "Polygon returned 429 (attempt {}/{}), backing off {}s",
                attempt,
                MAX_ATTEMPTS,
                RATE_LIMIT_BACKOFF.as_secs()
            );
            tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
        }

        Err(AnalysisError::UpstreamFailure(format!(
            "Polygon still rate limiting after {} attempts",
            MAX_ATTEMPTS
        )))
    }

    async fn status_error(response: Response, endpoint: &str) -> AnalysisError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        AnalysisError::UpstreamFailure(format!("{} returned {}: {}", endpoint, status, body))
    }

    /// OHLCV bars for `symbol` between two dates, oldest first.
    pub async fn get_aggregates(
        &self,
        symbol: &str,
        multiplier: u32,
        timespan: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, AnalysisError> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
            BASE_URL,
            symbol,
            multiplier,
            timespan,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let response = self
            .send(self.http.get(&url).query(&[("adjusted", "true"), ("sort", "asc")]))
            .await?;
        if !response.status().is_success() {
            return Err(Self::status_error(response, "Aggregates").await);
        }

        let agg_response: AggregateResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::DataUnavailable(format!("Malformed aggregates for {}: {}", symbol, e)))?;

        Ok(agg_response.into_bars())
    }

    /// Latest snapshot (last trade, today's bar, previous day's bar); `None` for unknown tickers.
    pub async fn get_snapshot(&self, symbol: &str) -> Result<Option<SnapshotTicker>, AnalysisError> {
        let url = format!(
            "{}/v2/snapshot/locale/us/markets/stocks/tickers/{}",
            BASE_URL, symbol
        );

        let response = self.send(self.http.get(&url)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => return Err(Self::status_error(response, "Snapshot").await),
            _ => {}
        }

        let snap_response: SnapshotResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::DataUnavailable(format!("Malformed snapshot for {}: {}", symbol, e)))?;

        Ok(Some(snap_response.ticker))
    }
}

#[async_trait]
impl PriceDataProvider for PolygonClient {
    async fn get_price_history(&self, symbol: &str, lookback_days: i64) -> Result<Vec<Bar>, AnalysisError> {
        let now = Utc::now();
        let start = now - ChronoDuration::days(lookback_days);
        self.get_aggregates(symbol, 1, "day", start, now).await
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Option<f64>, AnalysisError> {
        Ok(self.get_snapshot(symbol).await?.and_then(|snap| snap.price()))
    }
}

#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    t: i64, // timestamp
    o: f64, // open
    h: f64, // high
    l: f64, // low
    c: f64, // close
    v: f64, // volume
}

impl AggregateResponse {
    /// Bars with unparseable timestamps are dropped rather than misdated.
    fn into_bars(self) -> Vec<Bar> {
        self.results
            .into_iter()
            .filter_map(|r| {
                Some(Bar {
                    timestamp: DateTime::from_timestamp_millis(r.t)?,
                    open: r.o,
                    high: r.h,
                    low: r.l,
                    close: r.c,
                    volume: r.v,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    ticker: SnapshotTicker,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotTicker {
    pub day: Option<SnapshotDay>,
    #[serde(rename = "lastTrade")]
    pub last_trade: Option<SnapshotLastTrade>,
    #[serde(rename = "prevDay")]
    pub prev_day: Option<SnapshotDay>,
}

impl SnapshotTicker {
    /// Last trade, then today's close, then the previous session's close.
    /// Zero prices (pre-market placeholders) are skipped.
    pub fn price(&self) -> Option<f64> {
        let last_trade = self.last_trade.as_ref().and_then(|t| t.p);
        let day_close = self.day.as_ref().and_then(|d| d.c);
        let prev_close = self.prev_day.as_ref().and_then(|d| d.c);
        [last_trade, day_close, prev_close]
            .into_iter()
            .flatten()
            .find(|p| p.is_finite() && *p > 0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDay {
    pub o: Option<f64>,
    pub h: Option<f64>,
    pub l: Option<f64>,
    pub c: Option<f64>,
    pub v: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotLastTrade {
    pub p: Option<f64>,
    pub s: Option<i64>,
    pub t: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_response_parses_into_bars() {
        let body = r#"{
            "ticker": "AAPL",
            "results": [
                {"t": 1704171600000, "o": 187.15, "h": 188.44, "l": 183.89, "c": 185.64, "v": 82488674, "vw": 185.9},
                {"t": 1704258000000, "o": 184.22, "h": 185.88, "l": 183.43, "c": 184.25, "v": 58414460}
            ]
        }"#;
        let parsed: AggregateResponse = serde_json::from_str(body).unwrap();
        let bars = parsed.into_bars();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 185.64);
        assert_eq!(bars[1].volume, 58414460.0);
        assert!(bars[0].timestamp < bars[1].timestamp);
    }

    #[test]
    fn test_aggregate_response_without_results() {
        let parsed: AggregateResponse = serde_json::from_str(r#"{"ticker": "NOPE", "resultsCount": 0}"#).unwrap();
        assert!(parsed.into_bars().is_empty());
    }

    #[test]
    fn test_snapshot_price_fallbacks() {
        let body = r#"{
            "ticker": {
                "day": {"o": 0, "h": 0, "l": 0, "c": 0, "v": 0},
                "lastTrade": {"p": null},
                "prevDay": {"o": 180.0, "h": 182.0, "l": 179.0, "c": 181.5, "v": 1000}
            }
        }"#;
        let parsed: SnapshotResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.ticker.price(), Some(181.5));

        let empty = SnapshotTicker { day: None, last_trade: None, prev_day: None };
        assert_eq!(empty.price(), None);
    }

    #[test]
    fn test_snapshot_prefers_last_trade() {
        let snap = SnapshotTicker {
            day: Some(SnapshotDay { o: None, h: None, l: None, c: Some(99.0), v: None }),
            last_trade: Some(SnapshotLastTrade { p: Some(100.25), s: Some(10), t: None }),
            prev_day: None,
        };
        assert_eq!(snap.price(), Some(100.25));
    }

    #[tokio::test]
    async fn test_throttle_admits_up_to_capacity() {
        let throttle = Throttle::per_minute(3);
        for _ in 0..3 {
            throttle.wait_for_slot().await;
        }
        assert_eq!(throttle.issued.lock().await.len(), 3);
    }
}
