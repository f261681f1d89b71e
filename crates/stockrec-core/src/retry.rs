//! Retry policy for the chart fetch.

use std::time::Duration;

/// How many times the fetch is retried, how long to wait between tries, and
/// which HTTP statuses count as transient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt. Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Wait before every retry.
    pub delay: Duration,
    pub retry_on_status: Vec<u16>,
}

impl RetryConfig {
    const TRANSIENT_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

    /// Fixed retry count with a fixed delay between attempts.
    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            delay,
            retry_on_status: Self::TRANSIENT_STATUSES.to_vec(),
        }
    }

    pub const fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }
}
