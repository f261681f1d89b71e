//! Parse stored raw payloads that are still unprocessed.

use stockrec_core::{parse_daily, RawStatus};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Warehouse, WarehouseError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReprocessReport {
    /// Payloads parsed and saved, including known-bad days.
    pub processed: usize,
    /// Of `processed`, days whose chart failed validation.
    pub invalid: usize,
    /// Payloads that could not be decoded.
    pub failed: usize,
}

/// Parse up to `limit` pending raw payloads, save each analysis and mark the
/// raw row with the outcome.
///
/// A chart that fails validation is still saved and marked processed, so the
/// day is not retried. Undecodable payloads are marked failed with the decode
/// error. Storage errors abort the run.
pub fn process_pending(warehouse: &Warehouse, limit: usize) -> Result<ReprocessReport, WarehouseError> {
    let request_id = Uuid::new_v4().to_string();
    let mut report = ReprocessReport::default();

    for raw in warehouse.pending_raws(limit)? {
        let key = raw.key();
        match parse_daily(&raw.code, &raw.market, raw.date, raw.json.as_bytes()) {
            Ok(analysis) => {
                warehouse.save_analysis(&analysis)?;
                warehouse.mark_raw(&key, RawStatus::Processed, &analysis.message, &request_id)?;
                report.processed += 1;
                if analysis.error {
                    report.invalid += 1;
                }
            }
            Err(error) => {
                warn!(%key, %error, "raw payload could not be decoded");
                warehouse.mark_raw(&key, RawStatus::Failed, &error.to_string(), &request_id)?;
                report.failed += 1;
            }
        }
    }

    info!(
        %request_id,
        processed = report.processed,
        invalid = report.invalid,
        failed = report.failed,
        "reprocessing finished"
    );
    Ok(report)
}
