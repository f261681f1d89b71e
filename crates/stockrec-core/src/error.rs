use thiserror::Error;
use time::Date;

/// Structural problems found in a decoded chart payload.
///
/// These are business outcomes, not failures: the parser records the
/// message on the `DailyAnalysis` and returns it normally so the day can be
/// persisted as known-bad.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChartValidationError {
    #[error("[{code}] {description}")]
    Upstream { code: String, description: String },

    #[error("empty result")]
    EmptyResult,

    #[error("empty quotes")]
    EmptyQuotes,

    #[error("quote count mismatch")]
    QuoteCountMismatch {
        field: &'static str,
        timestamps: usize,
        values: usize,
    },

    #[error("trading periods count incorrect")]
    TradingPeriods,
}

/// The payload bytes were not a well-formed chart document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to decode chart payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The retrying fetcher gave up.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("upstream rejected request with status {status}")]
    Rejected { status: u16 },

    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

/// Error raised by a persistence collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StoreError {
    message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure of a single `(market, code, day)` ingestion task.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("existence check failed for {market}/{code}/{date}: {source}")]
    Lookup {
        market: String,
        code: String,
        date: Date,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Invalid configuration value supplied through the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {key} has invalid value '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_formats_code_and_description() {
        let error = ChartValidationError::Upstream {
            code: String::from("Not Found"),
            description: String::from("No data found, symbol may be delisted"),
        };

        assert_eq!(
            error.to_string(),
            "[Not Found] No data found, symbol may be delisted"
        );
    }

    #[test]
    fn mismatch_message_stays_stable_regardless_of_detail() {
        let error = ChartValidationError::QuoteCountMismatch {
            field: "close",
            timestamps: 5,
            values: 4,
        };

        assert_eq!(error.to_string(), "quote count mismatch");
    }

    #[test]
    fn lookup_error_names_the_day() {
        let error = IngestError::Lookup {
            market: String::from("america"),
            code: String::from("AAPL"),
            date: time::macros::date!(2024 - 03 - 08),
            source: StoreError::new("database is locked"),
        };

        assert_eq!(
            error.to_string(),
            "existence check failed for america/AAPL/2024-03-08: database is locked"
        );
    }
}
