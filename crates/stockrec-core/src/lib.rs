//! # Stockrec Core
//!
//! Minute-quote ingestion for the stockrec recorder.
//!
//! ## Overview
//!
//! This crate fetches one exchange/company/day of one-minute chart data from
//! the Yahoo Finance chart endpoint and turns it into session-classified bars:
//!
//! - **Ingestion orchestration**: skip days already stored, fetch the rest with
//!   retry, hand the raw payload to persistence
//! - **Chart decoding** of a deeply nested, mostly optional upstream schema
//! - **Structural validation** with stable, user-facing failure messages
//! - **Session classification** of every minute into pre-market, regular or
//!   post-market
//!
//! Persistence is abstracted behind [`QuoteStore`] and [`AnalysisSink`]; the
//! network behind [`HttpClient`].
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Write-once raw payload files |
//! | [`chart`] | Chart endpoint wire types and decoding |
//! | [`classifier`] | Session window lookup and bar classification |
//! | [`config`] | Ingestion settings |
//! | [`domain`] | Raw payloads, minute bars, daily analyses |
//! | [`error`] | Error types |
//! | [`fetcher`] | Fetch with retry |
//! | [`http_client`] | HTTP client abstraction |
//! | [`orchestrator`] | Dedup-then-fetch driver |
//! | [`parser`] | Decode, validate and classify one day |
//! | [`request`] | Chart request construction |
//! | [`retry`] | Retry policy |
//! | [`store`] | Persistence contracts |
//! | [`validation`] | Structural checks on decoded charts |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stockrec_core::{IngestConfig, IngestionOrchestrator, MemoryStore, ReqwestHttpClient};
//! use time::macros::datetime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = IngestionOrchestrator::new(
//!         IngestConfig::from_env()?,
//!         Arc::new(ReqwestHttpClient::new()),
//!         Arc::new(MemoryStore::new()),
//!     );
//!
//!     orchestrator
//!         .fetch_daily_quotes("america", "AAPL", "AAPL", datetime!(2024-03-08 00:00 -5))
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────┐
//! │ IngestionOrchestrator│────▶│ QuoteStore       │
//! └──────────┬───────────┘     │ (exists/enqueue) │
//!            │                 └──────────────────┘
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────┐
//! │ RetryingFetcher      │────▶│ HTTP Client      │
//! └──────────────────────┘     └──────────────────┘
//!
//! raw bytes ──▶ parse_daily ──▶ validate ──▶ classify_into ──▶ AnalysisSink
//! ```
//!
//! ## Error Handling
//!
//! Malformed JSON is a [`ParseError`]. A well-formed chart that fails
//! validation is not an error: the returned [`DailyAnalysis`] carries
//! `error = true` and the validation message.
//!
//! ```rust
//! use stockrec_core::parse_day;
//! use stockrec_core::parser::parse_daily;
//!
//! let date = parse_day("2024-03-08").unwrap();
//! let analysis = parse_daily("AAPL", "america", date, br#"{"chart":{"result":[]}}"#).unwrap();
//! assert!(analysis.error);
//! assert_eq!(analysis.message, "empty result");
//! ```

pub mod cache;
pub mod chart;
pub mod classifier;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod http_client;
pub mod orchestrator;
pub mod parser;
pub mod request;
pub mod retry;
pub mod store;
pub mod validation;

// Re-export commonly used types at crate root for convenience

pub use cache::RawFileCache;

pub use classifier::{classify_into, SessionWindows};

pub use config::IngestConfig;

pub use domain::{
    parse_day, DailyAnalysis, DayKey, MinuteBar, RawPayload, RawStatus, TradingSession,
};

pub use error::{
    ChartValidationError, ConfigError, FetchError, IngestError, ParseError, StoreError,
};

pub use fetcher::RetryingFetcher;

pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

pub use orchestrator::{FetchOutcome, IngestionOrchestrator};

pub use parser::parse_daily;

pub use request::{day_window, ChartRequest, DEFAULT_CHART_BASE_URL};

pub use retry::RetryConfig;

pub use store::{AnalysisSink, MemoryStore, QuoteStore};

pub use validation::{validate, ValidatedChart};
