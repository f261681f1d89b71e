//! Structural checks applied to a decoded chart before classification.

use crate::chart::{ChartEnvelope, ChartMeta, QuoteArrays};
use crate::classifier::SessionWindows;
use crate::error::ChartValidationError;

/// A chart that passed validation, with everything the classifier needs
/// already resolved: the first result, its first quote block and the first
/// window of each session.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedChart<'a> {
    pub meta: &'a ChartMeta,
    pub timestamps: &'a [i64],
    pub quote: &'a QuoteArrays,
    pub windows: SessionWindows<'a>,
}

/// Check a decoded chart, short-circuiting on the first failed rule.
///
/// Rules, in order:
/// 1. the API did not report an error object
/// 2. there is at least one result
/// 3. the first result has at least one quote block
/// 4. every quote array has as many entries as `timestamp`
/// 5. pre, regular and post each have a non-empty first window group
pub fn validate(envelope: &ChartEnvelope) -> Result<ValidatedChart<'_>, ChartValidationError> {
    let chart = &envelope.chart;

    if let Some(error) = &chart.error {
        return Err(ChartValidationError::Upstream {
            code: error.code.clone().unwrap_or_default(),
            description: error.description.clone().unwrap_or_default(),
        });
    }

    let result = chart
        .results()
        .first()
        .ok_or(ChartValidationError::EmptyResult)?;

    let quote = result
        .quotes()
        .first()
        .ok_or(ChartValidationError::EmptyQuotes)?;

    let timestamps = result.timestamps();
    let lengths = [
        ("open", quote.open().len()),
        ("close", quote.close().len()),
        ("high", quote.high().len()),
        ("low", quote.low().len()),
        ("volume", quote.volume().len()),
    ];
    if let Some(&(field, values)) = lengths.iter().find(|(_, len)| *len != timestamps.len()) {
        return Err(ChartValidationError::QuoteCountMismatch {
            field,
            timestamps: timestamps.len(),
            values,
        });
    }

    let meta = result
        .meta
        .as_ref()
        .ok_or(ChartValidationError::TradingPeriods)?;
    let windows = meta
        .trading_periods
        .as_ref()
        .and_then(SessionWindows::first_of)
        .ok_or(ChartValidationError::TradingPeriods)?;

    Ok(ValidatedChart {
        meta,
        timestamps,
        quote,
        windows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::decode;

    fn check(body: &str) -> Result<(), ChartValidationError> {
        let envelope = decode(body.as_bytes()).expect("fixture must decode");
        validate(&envelope).map(|_| ())
    }

    const PERIODS: &str = r#""tradingPeriods":{
        "pre":[[{"start":0,"end":10}]],
        "regular":[[{"start":10,"end":20}]],
        "post":[[{"start":20,"end":30}]]}"#;

    #[test]
    fn api_error_wins_over_every_other_rule() {
        let error = check(
            r#"{"chart":{"result":[],"error":{"code":"Bad Request","description":"Invalid input"}}}"#,
        )
        .expect_err("must fail");

        assert_eq!(error.to_string(), "[Bad Request] Invalid input");
    }

    #[test]
    fn missing_result_is_empty_result() {
        assert_eq!(
            check(r#"{"chart":{"result":null,"error":null}}"#),
            Err(ChartValidationError::EmptyResult)
        );
    }

    #[test]
    fn missing_indicators_is_empty_quotes() {
        assert_eq!(
            check(r#"{"chart":{"result":[{"timestamp":[1]}]}}"#),
            Err(ChartValidationError::EmptyQuotes)
        );
    }

    #[test]
    fn short_close_array_is_a_count_mismatch() {
        let body = format!(
            r#"{{"chart":{{"result":[{{"meta":{{{PERIODS}}},"timestamp":[1,2,3,4,5],
            "indicators":{{"quote":[{{"open":[1,1,1,1,1],"close":[1,1,1,1],
            "high":[1,1,1,1,1],"low":[1,1,1,1,1],"volume":[1,1,1,1,1]}}]}}}}]}}}}"#
        );

        assert_eq!(
            check(&body),
            Err(ChartValidationError::QuoteCountMismatch {
                field: "close",
                timestamps: 5,
                values: 4,
            })
        );
    }

    #[test]
    fn count_mismatch_is_reported_before_trading_periods() {
        let body = r#"{"chart":{"result":[{"timestamp":[1],
            "indicators":{"quote":[{"open":[],"close":[1],"high":[1],"low":[1],"volume":[1]}]}}]}}"#;

        assert!(matches!(
            check(body),
            Err(ChartValidationError::QuoteCountMismatch { field: "open", .. })
        ));
    }

    #[test]
    fn empty_post_group_fails_trading_periods() {
        let body = r#"{"chart":{"result":[{"meta":{"tradingPeriods":{
            "pre":[[{"start":0,"end":10}]],"regular":[[{"start":10,"end":20}]],"post":[[]]}},
            "timestamp":[],"indicators":{"quote":[{"open":[],"close":[],"high":[],"low":[],"volume":[]}]}}]}}"#;

        assert_eq!(check(body), Err(ChartValidationError::TradingPeriods));
    }

    #[test]
    fn regular_only_periods_fail_trading_periods() {
        let body = r#"{"chart":{"result":[{"meta":{"tradingPeriods":[[{"start":10,"end":20}]]},
            "timestamp":[],"indicators":{"quote":[{}]}}]}}"#;

        assert_eq!(check(body), Err(ChartValidationError::TradingPeriods));
    }

    #[test]
    fn empty_day_with_periods_is_valid() {
        let body = format!(
            r#"{{"chart":{{"result":[{{"meta":{{{PERIODS}}},"timestamp":[],"indicators":{{"quote":[{{}}]}}}}]}}}}"#
        );

        assert_eq!(check(&body), Ok(()));
    }
}
