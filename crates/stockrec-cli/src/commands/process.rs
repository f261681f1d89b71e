use serde::Serialize;
use serde_json::Value;
use stockrec_warehouse::process_pending;

use crate::cli::ProcessArgs;
use crate::error::CliError;

use super::Settings;

#[derive(Debug, Serialize)]
struct ProcessResponseData {
    processed: usize,
    invalid: usize,
    failed: usize,
}

pub fn run(args: &ProcessArgs, settings: &Settings) -> Result<Value, CliError> {
    let warehouse = settings.open_warehouse()?;
    let report = process_pending(&warehouse, args.limit)?;

    Ok(serde_json::to_value(ProcessResponseData {
        processed: report.processed,
        invalid: report.invalid,
        failed: report.failed,
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stockrec_core::{IngestConfig, RawPayload};
    use stockrec_warehouse::WarehouseConfig;
    use tempfile::tempdir;
    use time::macros::date;

    #[test]
    fn reports_counts_as_json() {
        let temp = tempdir().expect("tempdir");
        let settings = Settings {
            ingest: IngestConfig::default(),
            warehouse: WarehouseConfig::in_home(temp.path()),
        };
        settings
            .open_warehouse()
            .expect("warehouse")
            .insert_raw(
                &RawPayload::unprocessed("america", "AAPL", date!(2024 - 03 - 08), "not json"),
                "seed",
            )
            .expect("seed");

        let data = run(&ProcessArgs { limit: 10 }, &settings).expect("process");

        assert_eq!(data, json!({"processed": 0, "invalid": 0, "failed": 1}));
    }
}
