use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use stockrec_core::{FetchOutcome, IngestionOrchestrator, ReqwestHttpClient};
use stockrec_warehouse::QueuedStore;
use time::{OffsetDateTime, PrimitiveDateTime, Time};

use crate::cli::FetchArgs;
use crate::error::CliError;

use super::Settings;

#[derive(Debug, Serialize)]
struct FetchResponseData<'a> {
    market: &'a str,
    code: &'a str,
    date: String,
    outcome: &'static str,
    bytes: usize,
    written: usize,
    duplicates: usize,
    failed: usize,
}

pub async fn run(args: &FetchArgs, settings: &Settings) -> Result<Value, CliError> {
    let store = QueuedStore::start(settings.open_warehouse()?)?;
    let orchestrator = IngestionOrchestrator::new(
        settings.ingest.clone(),
        Arc::new(ReqwestHttpClient::new()),
        Arc::new(store.clone()),
    );

    let day: OffsetDateTime =
        PrimitiveDateTime::new(args.day.date, Time::MIDNIGHT).assume_offset(args.utc_offset);
    let query_code = args.query_code.as_deref().unwrap_or(&args.day.code);

    let outcome = orchestrator
        .fetch_daily_quotes(&args.day.market, &args.day.code, query_code, day)
        .await;
    let report = store.shutdown();
    let outcome = outcome?;

    let (label, bytes) = match outcome {
        FetchOutcome::AlreadyPresent => ("already_present", 0),
        FetchOutcome::Enqueued { bytes } => ("enqueued", bytes),
    };

    Ok(serde_json::to_value(FetchResponseData {
        market: &args.day.market,
        code: &args.day.code,
        date: args.day.date.to_string(),
        outcome: label,
        bytes,
        written: report.written,
        duplicates: report.duplicates,
        failed: report.failed,
    })?)
}
