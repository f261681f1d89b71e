//! Chart endpoint request construction.

use time::{Duration, OffsetDateTime, Time};

use crate::http_client::HttpRequest;

pub const DEFAULT_CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// `[local midnight, local midnight + 24h)` of `day`, in `day`'s own offset.
pub fn day_window(day: OffsetDateTime) -> (OffsetDateTime, OffsetDateTime) {
    let start = day.replace_time(Time::MIDNIGHT);
    let end = start.saturating_add(Duration::days(1));
    (start, end)
}

/// One-minute chart query covering a single trading day, with pre/post
/// market bars included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    pub symbol: String,
    pub period1: i64,
    pub period2: i64,
}

impl ChartRequest {
    pub fn minute_day(symbol: impl Into<String>, day: OffsetDateTime) -> Self {
        let (start, end) = day_window(day);
        Self {
            symbol: symbol.into(),
            period1: start.unix_timestamp(),
            period2: end.unix_timestamp(),
        }
    }

    pub fn url(&self, base: &str) -> String {
        format!(
            "{}/{}?period1={}&period2={}&interval=1m&indicators=quote&includeTimestamps=true&includePrePost=true&events=div%7Csplit%7Cearn",
            base.trim_end_matches('/'),
            urlencoding::encode(&self.symbol),
            self.period1,
            self.period2
        )
    }

    pub fn to_http(&self, base: &str, timeout_ms: u64) -> HttpRequest {
        HttpRequest::get(self.url(base))
            .with_header("accept", "application/json")
            .with_timeout_ms(timeout_ms)
    }
}
