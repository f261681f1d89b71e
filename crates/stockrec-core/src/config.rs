//! Ingestion settings.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::request::DEFAULT_CHART_BASE_URL;
use crate::retry::RetryConfig;

const ENV_CHART_URL: &str = "STOCKREC_CHART_URL";
const ENV_RETRY_TIMES: &str = "STOCKREC_RETRY_TIMES";
const ENV_RETRY_INTERVAL_SECS: &str = "STOCKREC_RETRY_INTERVAL_SECS";
const ENV_DATA_DIR: &str = "STOCKREC_DATA_DIR";

const DEFAULT_RETRY_TIMES: u32 = 5;
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Settings handed to the ingestion orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub chart_base_url: String,
    pub retry: RetryConfig,
    pub request_timeout_ms: u64,
    /// Root of the raw-file cache. `None` disables it.
    pub data_dir: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chart_base_url: DEFAULT_CHART_BASE_URL.to_owned(),
            retry: RetryConfig::fixed(
                Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
                DEFAULT_RETRY_TIMES,
            ),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            data_dir: None,
        }
    }
}

impl IngestConfig {
    /// Defaults overridden by `STOCKREC_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`IngestConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = non_empty(ENV_CHART_URL) {
            config.chart_base_url = url.trim().to_owned();
        }

        let retry_times = match non_empty(ENV_RETRY_TIMES) {
            Some(value) => parse_number(ENV_RETRY_TIMES, &value)?,
            None => DEFAULT_RETRY_TIMES,
        };
        let retry_interval_secs = match non_empty(ENV_RETRY_INTERVAL_SECS) {
            Some(value) => parse_number(ENV_RETRY_INTERVAL_SECS, &value)?,
            None => DEFAULT_RETRY_INTERVAL_SECS,
        };
        config.retry = RetryConfig::fixed(Duration::from_secs(retry_interval_secs), retry_times);

        if let Some(dir) = non_empty(ENV_DATA_DIR) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = IngestConfig::from_lookup(lookup(&[])).expect("config");

        assert_eq!(config, IngestConfig::default());
        assert_eq!(config.retry.total_attempts(), 6);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn environment_overrides_each_setting() {
        let config = IngestConfig::from_lookup(lookup(&[
            ("STOCKREC_CHART_URL", "http://localhost:9000/chart"),
            ("STOCKREC_RETRY_TIMES", "2"),
            ("STOCKREC_RETRY_INTERVAL_SECS", "0"),
            ("STOCKREC_DATA_DIR", "/srv/stockrec"),
        ]))
        .expect("config");

        assert_eq!(config.chart_base_url, "http://localhost:9000/chart");
        assert_eq!(config.retry, RetryConfig::fixed(Duration::ZERO, 2));
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/stockrec")));
    }

    #[test]
    fn malformed_number_is_reported_with_its_key() {
        let error = IngestConfig::from_lookup(lookup(&[("STOCKREC_RETRY_TIMES", "many")]))
            .expect_err("must fail");

        assert_eq!(
            error,
            ConfigError::InvalidValue {
                key: "STOCKREC_RETRY_TIMES",
                value: String::from("many"),
            }
        );
    }
}
