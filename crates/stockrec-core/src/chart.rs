//! Wire model of the Yahoo Finance chart endpoint.
//!
//! Every list and nested object is optional on the wire: failed lookups
//! send `"result": null`, thin symbols omit `timestamp`, and quote arrays
//! carry `null` for minutes without trades. A `null` object, list element or
//! window bound decodes as its empty default, and the accessors below flatten
//! the rest into (possibly empty) slices so callers never index into an
//! absent value.

use serde::{Deserialize, Deserializer};

use crate::error::ParseError;

/// Decode raw response bytes into a chart envelope.
///
/// Only bytes that are not well-formed JSON of the expected shape fail;
/// `null` anywhere in the tree is read as an empty value.
pub fn decode(raw: &[u8]) -> Result<ChartEnvelope, ParseError> {
    let envelope: Option<ChartEnvelope> = serde_json::from_slice(raw)?;
    Ok(envelope.unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?;
    Ok(items
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}

fn window_groups<'de, D>(deserializer: D) -> Result<Vec<Vec<TradingWindow>>, D::Error>
where
    D: Deserializer<'de>,
{
    let groups = Option::<Vec<Option<Vec<Option<TradingWindow>>>>>::deserialize(deserializer)?;
    Ok(groups
        .unwrap_or_default()
        .into_iter()
        .map(|group| {
            group
                .unwrap_or_default()
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect()
        })
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChartEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub chart: ChartBody,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChartBody {
    #[serde(default, deserialize_with = "nullable_list")]
    pub result: Vec<ChartResult>,
    #[serde(default)]
    pub error: Option<ChartApiError>,
}

impl ChartBody {
    pub fn results(&self) -> &[ChartResult] {
        &self.result
    }
}

/// Error object reported by the API in place of a result.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChartApiError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub meta: Option<ChartMeta>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub timestamp: Vec<i64>,
    #[serde(default)]
    pub indicators: Option<Indicators>,
}

impl ChartResult {
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamp
    }

    pub fn quotes(&self) -> &[QuoteArrays] {
        match &self.indicators {
            Some(indicators) => indicators.quote.as_slice(),
            None => &[],
        }
    }

    pub fn trading_periods(&self) -> Option<&TradingPeriods> {
        self.meta.as_ref()?.trading_periods.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub exchange_name: Option<String>,
    #[serde(default)]
    pub instrument_type: Option<String>,
    #[serde(default)]
    pub first_trade_date: Option<i64>,
    #[serde(default)]
    pub regular_market_time: Option<i64>,
    #[serde(default, rename = "gmtoffset")]
    pub gmt_offset: Option<i32>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub exchange_timezone_name: Option<String>,
    #[serde(default)]
    pub previous_close: Option<f64>,
    #[serde(default)]
    pub chart_previous_close: Option<f64>,
    #[serde(default)]
    pub scale: Option<i32>,
    #[serde(default)]
    pub price_hint: Option<i32>,
    #[serde(default)]
    pub current_trading_period: Option<CurrentTradingPeriod>,
    #[serde(default)]
    pub trading_periods: Option<TradingPeriods>,
    #[serde(default)]
    pub data_granularity: Option<String>,
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub valid_ranges: Option<Vec<String>>,
}

/// Session windows of the most recent trading day, as reported by the API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CurrentTradingPeriod {
    #[serde(default)]
    pub pre: Option<TradingWindow>,
    #[serde(default)]
    pub regular: Option<TradingWindow>,
    #[serde(default)]
    pub post: Option<TradingWindow>,
}

/// A session window in epoch seconds, half-open: `[start, end)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TradingWindow {
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub start: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub end: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub gmtoffset: i32,
}

impl TradingWindow {
    pub const fn contains(&self, ts: i64) -> bool {
        self.start <= ts && ts < self.end
    }
}

/// Per-session window groups for every day covered by the response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "TradingPeriodsRepr")]
pub struct TradingPeriods {
    pub pre: Vec<Vec<TradingWindow>>,
    pub regular: Vec<Vec<TradingWindow>>,
    pub post: Vec<Vec<TradingWindow>>,
}

// With `includePrePost=false` the API sends the regular groups as a bare
// list of lists instead of an object keyed by session.
#[derive(Deserialize)]
#[serde(untagged)]
enum TradingPeriodsRepr {
    RegularOnly(#[serde(deserialize_with = "window_groups")] Vec<Vec<TradingWindow>>),
    Sessions {
        #[serde(default, deserialize_with = "window_groups")]
        pre: Vec<Vec<TradingWindow>>,
        #[serde(default, deserialize_with = "window_groups")]
        regular: Vec<Vec<TradingWindow>>,
        #[serde(default, deserialize_with = "window_groups")]
        post: Vec<Vec<TradingWindow>>,
    },
}

impl From<TradingPeriodsRepr> for TradingPeriods {
    fn from(repr: TradingPeriodsRepr) -> Self {
        match repr {
            TradingPeriodsRepr::RegularOnly(regular) => Self {
                pre: Vec::new(),
                regular,
                post: Vec::new(),
            },
            TradingPeriodsRepr::Sessions { pre, regular, post } => Self { pre, regular, post },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Indicators {
    #[serde(default, deserialize_with = "nullable_list")]
    pub quote: Vec<QuoteArrays>,
}

/// Parallel per-minute quote arrays, index-aligned with `timestamp`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuoteArrays {
    #[serde(default)]
    pub open: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub close: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub high: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub low: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub volume: Option<Vec<Option<i64>>>,
}

impl QuoteArrays {
    pub fn open(&self) -> &[Option<f64>] {
        self.open.as_deref().unwrap_or(&[])
    }

    pub fn close(&self) -> &[Option<f64>] {
        self.close.as_deref().unwrap_or(&[])
    }

    pub fn high(&self) -> &[Option<f64>] {
        self.high.as_deref().unwrap_or(&[])
    }

    pub fn low(&self) -> &[Option<f64>] {
        self.low.as_deref().unwrap_or(&[])
    }

    pub fn volume(&self) -> &[Option<i64>] {
        self.volume.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_null_result_and_error_object() {
        let body = br#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        let envelope = decode(body).expect("decode");

        assert!(envelope.chart.results().is_empty());
        let error = envelope.chart.error.expect("error object");
        assert_eq!(error.code.as_deref(), Some("Not Found"));
    }

    #[test]
    fn missing_chart_key_decodes_to_empty_body() {
        let envelope = decode(b"{}").expect("decode");
        assert_eq!(envelope, ChartEnvelope::default());
    }

    #[test]
    fn null_quote_values_are_kept_in_position() {
        let body = br#"{"chart":{"result":[{"timestamp":[1,2],"indicators":{"quote":[
            {"open":[1.5,null],"close":[1.6,null],"high":[1.7,null],"low":[1.4,null],"volume":[100,null]}
        ]}}]}}"#;
        let envelope = decode(body).expect("decode");
        let quote = &envelope.chart.results()[0].quotes()[0];

        assert_eq!(quote.open(), &[Some(1.5), None]);
        assert_eq!(quote.volume(), &[Some(100), None]);
    }

    #[test]
    fn trading_periods_accept_session_object() {
        let body = br#"{"chart":{"result":[{"meta":{"tradingPeriods":{
            "pre":[[{"timezone":"EST","start":100,"end":200,"gmtoffset":-18000}]],
            "regular":[[{"timezone":"EST","start":200,"end":300,"gmtoffset":-18000}]]
        }}}]}}"#;
        let envelope = decode(body).expect("decode");
        let periods = envelope.chart.results()[0]
            .trading_periods()
            .expect("periods");

        assert_eq!(periods.pre[0][0].start, 100);
        assert_eq!(periods.regular[0][0].end, 300);
        assert!(periods.post.is_empty());
    }

    #[test]
    fn trading_periods_accept_bare_regular_groups() {
        let body = br#"{"chart":{"result":[{"meta":{"tradingPeriods":[
            [{"timezone":"JST","start":10,"end":20,"gmtoffset":32400}]
        ]}}]}}"#;
        let envelope = decode(body).expect("decode");
        let periods = envelope.chart.results()[0]
            .trading_periods()
            .expect("periods");

        assert!(periods.pre.is_empty());
        assert_eq!(periods.regular[0][0].gmtoffset, 32_400);
    }

    #[test]
    fn window_membership_is_half_open() {
        let window = TradingWindow {
            timezone: None,
            start: 100,
            end: 160,
            gmtoffset: 0,
        };

        assert!(!window.contains(99));
        assert!(window.contains(100));
        assert!(window.contains(159));
        assert!(!window.contains(160));
    }

    #[test]
    fn truncated_json_is_a_decode_error() {
        let error = decode(br#"{"chart":{"result":["#).expect_err("must fail");
        assert!(matches!(error, ParseError::Decode(_)));
    }

    #[test]
    fn null_chart_and_null_document_decode_as_empty() {
        assert_eq!(decode(b"null").expect("decode"), ChartEnvelope::default());
        assert_eq!(decode(br#"{"chart":null}"#).expect("decode"), ChartEnvelope::default());
    }

    #[test]
    fn null_list_elements_decode_as_defaults() {
        let body = br#"{"chart":{"result":[{"timestamp":[5,null],"indicators":{"quote":[null]}}, null]}}"#;
        let envelope = decode(body).expect("decode");
        let results = envelope.chart.results();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].timestamps(), &[5, 0]);
        assert_eq!(results[0].quotes(), &[QuoteArrays::default()]);
        assert_eq!(results[1], ChartResult::default());
    }

    #[test]
    fn null_window_bounds_and_groups_decode_as_defaults() {
        let body = br#"{"chart":{"result":[{"meta":{"tradingPeriods":{
            "pre":[[{"start":null,"end":200,"gmtoffset":null}]],
            "regular":[null],
            "post":[[null]]
        }}}]}}"#;
        let envelope = decode(body).expect("decode");
        let periods = envelope.chart.results()[0]
            .trading_periods()
            .expect("periods");

        assert_eq!((periods.pre[0][0].start, periods.pre[0][0].end), (0, 200));
        assert!(periods.regular[0].is_empty());
        assert_eq!(periods.post[0][0], TradingWindow::default());
    }
}
