//! # Domain Models
//!
//! Types that flow out of the ingestion pipeline and into persistence.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RawPayload`] | One day's unparsed chart response, as fetched |
//! | [`RawStatus`] | Processing state of a stored raw payload |
//! | [`DayKey`] | `(market, code, date)` identity shared by raw and derived rows |
//! | [`TradingSession`] | Pre-market, regular or post-market |
//! | [`MinuteBar`] | One 60-second OHLCV bar |
//! | [`DailyAnalysis`] | Classified bars for one day, or the reason the day is unusable |
//!
//! Dates are calendar days in the exchange's local calendar. Bar bounds are
//! epoch seconds.

mod models;

pub use models::{
    parse_day, DailyAnalysis, DayKey, MinuteBar, RawPayload, RawStatus, TradingSession,
};
