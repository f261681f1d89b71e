//! Dedup-then-fetch driver for one `(market, code, day)`.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::cache::RawFileCache;
use crate::config::IngestConfig;
use crate::domain::RawPayload;
use crate::error::IngestError;
use crate::fetcher::RetryingFetcher;
use crate::http_client::HttpClient;
use crate::request::ChartRequest;
use crate::store::QuoteStore;

/// What a single ingestion task did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The store already holds the day; nothing was fetched.
    AlreadyPresent,
    /// The day was fetched and handed to the store.
    Enqueued { bytes: usize },
}

/// Fetches a day's minute chart unless the store already has it.
///
/// Cheap to clone; one clone per concurrent task.
#[derive(Clone)]
pub struct IngestionOrchestrator {
    store: Arc<dyn QuoteStore>,
    fetcher: RetryingFetcher,
    chart_base_url: String,
    request_timeout_ms: u64,
    file_cache: Option<RawFileCache>,
}

impl IngestionOrchestrator {
    pub fn new(
        config: IngestConfig,
        http_client: Arc<dyn HttpClient>,
        store: Arc<dyn QuoteStore>,
    ) -> Self {
        Self {
            store,
            fetcher: RetryingFetcher::new(http_client, config.retry),
            chart_base_url: config.chart_base_url,
            request_timeout_ms: config.request_timeout_ms,
            file_cache: config.data_dir.map(RawFileCache::new),
        }
    }

    pub fn with_file_cache(mut self, cache: RawFileCache) -> Self {
        self.file_cache = Some(cache);
        self
    }

    pub fn file_cache(&self) -> Option<&RawFileCache> {
        self.file_cache.as_ref()
    }

    /// Fetch and enqueue `day` for `code` on `market`.
    ///
    /// `query_code` is the symbol as the chart endpoint knows it. The stored
    /// date is `day`'s calendar date in its own offset, and the fetch window
    /// is that local day.
    pub async fn fetch_daily_quotes(
        &self,
        market: &str,
        code: &str,
        query_code: &str,
        day: OffsetDateTime,
    ) -> Result<FetchOutcome, IngestError> {
        let date = day.date();

        let present = self
            .store
            .exists(market, code, date)
            .map_err(|source| IngestError::Lookup {
                market: market.to_owned(),
                code: code.to_owned(),
                date,
                source,
            })?;
        if present {
            debug!(market, code, %date, "day already stored, skipping fetch");
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let request = ChartRequest::minute_day(query_code, day);
        debug!(
            market,
            code,
            query_code,
            period1 = request.period1,
            period2 = request.period2,
            "fetching minute chart"
        );
        let body = self
            .fetcher
            .fetch(&request.to_http(&self.chart_base_url, self.request_timeout_ms))
            .await?;
        let bytes = body.len();

        if let Some(cache) = &self.file_cache {
            match cache.store(market, code, date, body.as_bytes()) {
                Ok(true) => debug!(market, code, %date, "raw payload cached on disk"),
                Ok(false) => debug!(market, code, %date, "raw file already present"),
                Err(error) => warn!(
                    market,
                    code,
                    %date,
                    path = %cache.path_for(market, code, date).display(),
                    %error,
                    "failed to write raw file"
                ),
            }
        }

        self.store
            .enqueue(RawPayload::unprocessed(market, code, date, body));
        info!(market, code, %date, bytes, "raw payload enqueued");

        Ok(FetchOutcome::Enqueued { bytes })
    }
}
