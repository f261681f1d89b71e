//! Decode → validate → classify for one day's payload.

use time::Date;
use tracing::debug;

use crate::chart;
use crate::classifier::classify_into;
use crate::domain::DailyAnalysis;
use crate::error::ParseError;
use crate::validation::validate;

/// Turn one day's raw chart bytes into a [`DailyAnalysis`].
///
/// Malformed JSON is the only hard failure. A well-formed payload that fails
/// validation comes back as `Ok` with `error` set and the validator's message,
/// so callers can persist the day as known-bad instead of refetching it.
pub fn parse_daily(
    code: &str,
    market: &str,
    date: Date,
    raw: &[u8],
) -> Result<DailyAnalysis, ParseError> {
    let envelope = chart::decode(raw)?;
    let mut analysis = DailyAnalysis::new(code, market, date);

    let chart = match validate(&envelope) {
        Ok(chart) => chart,
        Err(error) => {
            debug!(market, code, %date, reason = %error, "chart payload rejected");
            analysis.mark_failed(error.to_string());
            return Ok(analysis);
        }
    };

    let dropped = classify_into(&chart, &mut analysis);
    debug!(
        market,
        code,
        %date,
        currency = chart.meta.currency.as_deref().unwrap_or(""),
        pre = analysis.pre.len(),
        regular = analysis.regular.len(),
        post = analysis.post.len(),
        dropped,
        "classified minute bars"
    );

    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const DAY: Date = date!(2024 - 03 - 08);

    #[test]
    fn decode_failure_produces_no_analysis() {
        let error = parse_daily("AAPL", "america", DAY, b"<html>rate limited</html>")
            .expect_err("must fail");
        assert!(error.to_string().starts_with("failed to decode chart payload"));
    }

    #[test]
    fn validation_failure_is_returned_as_data() {
        let analysis = parse_daily("AAPL", "america", DAY, br#"{"chart":{"result":[]}}"#)
            .expect("validation failures are not hard errors");

        assert_eq!(analysis.code, "AAPL");
        assert_eq!(analysis.market, "america");
        assert_eq!(analysis.date, DAY);
        assert!(analysis.error);
        assert_eq!(analysis.message, "empty result");
        assert_eq!(analysis.bar_count(), 0);
    }

    #[test]
    fn post_market_bars_land_in_post() {
        let body = br#"{"chart":{"result":[{
            "meta":{"currency":"USD","tradingPeriods":{
                "pre":[[{"start":0,"end":60}]],
                "regular":[[{"start":60,"end":120}]],
                "post":[[{"start":120,"end":240}]]}},
            "timestamp":[0,60,120,180],
            "indicators":{"quote":[{
                "open":[1,2,3,4],"close":[1,2,3,4],"high":[1,2,3,4],"low":[1,2,3,4],
                "volume":[10,20,30,40]}]}}]}}"#;

        let analysis = parse_daily("AAPL", "america", DAY, body).expect("parse");

        assert!(!analysis.error);
        assert_eq!(analysis.pre.len(), 1);
        assert_eq!(analysis.regular.len(), 1);
        assert_eq!(analysis.post.len(), 2);
        assert_eq!(analysis.regular[0].start, 60);
        assert_eq!(
            analysis.post.iter().map(|bar| bar.start).collect::<Vec<_>>(),
            vec![120, 180]
        );
    }

    #[test]
    fn null_minutes_are_zero_filled_not_dropped() {
        let body = br#"{"chart":{"result":[{
            "meta":{"tradingPeriods":{
                "pre":[[{"start":0,"end":60}]],
                "regular":[[{"start":60,"end":180}]],
                "post":[[{"start":180,"end":240}]]}},
            "timestamp":[60,120],
            "indicators":{"quote":[{
                "open":[5.5,null],"close":[5.6,null],"high":[5.7,null],"low":[5.4,null],
                "volume":[1000,null]}]}}]}}"#;

        let analysis = parse_daily("AAPL", "america", DAY, body).expect("parse");

        assert_eq!(analysis.regular.len(), 2);
        let empty = &analysis.regular[1];
        assert_eq!((empty.open, empty.close, empty.volume), (0.0, 0.0, 0));
        assert_eq!(analysis.regular[0].high, 5.7);
    }

    #[test]
    fn null_shapes_reach_validation_instead_of_failing_decode() {
        let cases: [(&str, &str); 4] = [
            (r#"{"chart":null}"#, "empty result"),
            (r#"{"chart":{"result":[null]}}"#, "empty quotes"),
            (
                r#"{"chart":{"result":[{"timestamp":[],"indicators":{"quote":[null]}}]}}"#,
                "trading periods count incorrect",
            ),
            (
                r#"{"chart":{"result":[{"timestamp":[1],"indicators":{"quote":[null]}}]}}"#,
                "quote count mismatch",
            ),
        ];

        for (body, message) in cases {
            let analysis =
                parse_daily("AAPL", "america", DAY, body.as_bytes()).expect("well-formed json");
            assert!(analysis.error);
            assert_eq!(analysis.message, message);
        }
    }

    #[test]
    fn null_window_start_reads_as_zero() {
        let body = br#"{"chart":{"result":[{
            "meta":{"tradingPeriods":{
                "pre":[[{"start":null,"end":60}]],
                "regular":[[{"start":60,"end":120}]],
                "post":[[{"start":120,"end":180}]]}},
            "timestamp":[30],
            "indicators":{"quote":[{
                "open":[1],"close":[1],"high":[1],"low":[1],"volume":[1]}]}}]}}"#;

        let analysis = parse_daily("AAPL", "america", DAY, body).expect("parse");

        assert!(!analysis.error);
        assert_eq!(analysis.pre.len(), 1);
        assert_eq!(analysis.pre[0].start, 30);
    }
}
