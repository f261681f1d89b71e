use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

const DAY_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` calendar day.
pub fn parse_day(input: &str) -> Result<Date, time::error::Parse> {
    Date::parse(input.trim(), DAY_FORMAT)
}

mod day_serde {
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(date)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        super::parse_day(&value).map_err(D::Error::custom)
    }
}

/// Identity of one stored day: exchange, company and local calendar date.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DayKey {
    pub market: String,
    pub code: String,
    #[serde(with = "day_serde")]
    pub date: Date,
}

impl DayKey {
    pub fn new(market: impl Into<String>, code: impl Into<String>, date: Date) -> Self {
        Self {
            market: market.into(),
            code: code.into(),
            date,
        }
    }
}

impl Display for DayKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.market, self.code, self.date)
    }
}

/// Processing state of a stored raw payload. Stored as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawStatus {
    Unprocessed,
    Processed,
    Failed,
}

impl RawStatus {
    pub const fn code(self) -> i32 {
        match self {
            Self::Unprocessed => 0,
            Self::Processed => 1,
            Self::Failed => 2,
        }
    }

    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Unprocessed),
            1 => Some(Self::Processed),
            2 => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Unparsed upstream response for one day, persisted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPayload {
    pub market: String,
    pub code: String,
    #[serde(with = "day_serde")]
    pub date: Date,
    pub json: String,
    pub status: RawStatus,
    pub message: String,
}

impl RawPayload {
    /// A freshly fetched payload awaiting parsing.
    pub fn unprocessed(
        market: impl Into<String>,
        code: impl Into<String>,
        date: Date,
        json: impl Into<String>,
    ) -> Self {
        Self {
            market: market.into(),
            code: code.into(),
            date,
            json: json.into(),
            status: RawStatus::Unprocessed,
            message: String::new(),
        }
    }

    pub fn key(&self) -> DayKey {
        DayKey::new(self.market.as_str(), self.code.as_str(), self.date)
    }
}

/// Trading session a minute bar belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingSession {
    Pre,
    Regular,
    Post,
}

impl TradingSession {
    /// Membership test order used by the classifier.
    pub const ALL: [Self; 3] = [Self::Pre, Self::Regular, Self::Post];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pre => "pre",
            Self::Regular => "regular",
            Self::Post => "post",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pre" => Some(Self::Pre),
            "regular" => Some(Self::Regular),
            "post" => Some(Self::Post),
            _ => None,
        }
    }
}

impl Display for TradingSession {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OHLCV aggregate for the 60 seconds starting at `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinuteBar {
    pub code: String,
    pub market: String,
    pub start: i64,
    pub end: i64,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: i64,
}

impl MinuteBar {
    pub const SPAN_SECS: i64 = 60;

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        code: impl Into<String>,
        market: impl Into<String>,
        start: i64,
        open: f64,
        close: f64,
        high: f64,
        low: f64,
        volume: i64,
    ) -> Self {
        Self {
            code: code.into(),
            market: market.into(),
            start,
            end: start.saturating_add(Self::SPAN_SECS),
            open,
            close,
            high,
            low,
            volume,
        }
    }
}

/// Result of parsing one day's payload.
///
/// Either `error` is set with a `message` and every session is empty, or the
/// sessions hold the classified bars in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAnalysis {
    pub code: String,
    pub market: String,
    #[serde(with = "day_serde")]
    pub date: Date,
    pub error: bool,
    pub message: String,
    pub pre: Vec<MinuteBar>,
    pub regular: Vec<MinuteBar>,
    pub post: Vec<MinuteBar>,
}

impl DailyAnalysis {
    /// Identity-only shell with no bars and no error.
    pub fn new(code: impl Into<String>, market: impl Into<String>, date: Date) -> Self {
        Self {
            code: code.into(),
            market: market.into(),
            date,
            error: false,
            message: String::new(),
            pre: Vec::new(),
            regular: Vec::new(),
            post: Vec::new(),
        }
    }

    pub fn key(&self) -> DayKey {
        DayKey::new(self.market.as_str(), self.code.as_str(), self.date)
    }

    /// Record a validation failure. Any bars already collected are discarded.
    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.error = true;
        self.message = message.into();
        self.pre.clear();
        self.regular.clear();
        self.post.clear();
    }

    pub fn push(&mut self, session: TradingSession, bar: MinuteBar) {
        self.bars_mut(session).push(bar);
    }

    pub fn bars(&self, session: TradingSession) -> &[MinuteBar] {
        match session {
            TradingSession::Pre => &self.pre,
            TradingSession::Regular => &self.regular,
            TradingSession::Post => &self.post,
        }
    }

    fn bars_mut(&mut self, session: TradingSession) -> &mut Vec<MinuteBar> {
        match session {
            TradingSession::Pre => &mut self.pre,
            TradingSession::Regular => &mut self.regular,
            TradingSession::Post => &mut self.post,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.pre.len() + self.regular.len() + self.post.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn minute_bar_end_is_one_minute_after_start() {
        let bar = MinuteBar::new("AAPL", "america", 1_709_906_400, 1.0, 2.0, 3.0, 0.5, 10);
        assert_eq!(bar.end - bar.start, 60);
    }

    #[test]
    fn minute_bar_end_saturates_instead_of_overflowing() {
        let bar = MinuteBar::new("AAPL", "america", i64::MAX - 10, 1.0, 1.0, 1.0, 1.0, 0);
        assert_eq!(bar.end, i64::MAX);
    }

    #[test]
    fn mark_failed_clears_collected_bars() {
        let mut analysis = DailyAnalysis::new("AAPL", "america", date!(2024 - 03 - 08));
        analysis.push(
            TradingSession::Regular,
            MinuteBar::new("AAPL", "america", 0, 1.0, 1.0, 1.0, 1.0, 1),
        );

        analysis.mark_failed("empty quotes");

        assert!(analysis.error);
        assert_eq!(analysis.message, "empty quotes");
        assert_eq!(analysis.bar_count(), 0);
    }

    #[test]
    fn raw_status_codes_round_trip_and_reject_unknown() {
        for status in [RawStatus::Unprocessed, RawStatus::Processed, RawStatus::Failed] {
            assert_eq!(RawStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(RawStatus::Unprocessed.code(), 0);
        assert_eq!(RawStatus::from_code(7), None);
    }

    #[test]
    fn analysis_serializes_date_as_calendar_day() {
        let analysis = DailyAnalysis::new("7203", "japan", date!(2024 - 01 - 05));
        let value = serde_json::to_value(&analysis).expect("serialize");
        assert_eq!(value["date"], "2024-01-05");

        let back: DailyAnalysis = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back.date, date!(2024 - 01 - 05));
    }

    #[test]
    fn parse_day_rejects_garbage() {
        assert_eq!(parse_day("2024-02-29").expect("leap day"), date!(2024 - 02 - 29));
        assert!(parse_day("2023-02-29").is_err());
        assert!(parse_day("20240229").is_err());
    }
}
