use std::fs;

use serde_json::Value;
use stockrec_core::{parse_daily, DayKey};
use tracing::info;

use crate::cli::ParseArgs;
use crate::error::CliError;

use super::Settings;

pub fn run(args: &ParseArgs, settings: &Settings) -> Result<Value, CliError> {
    let day = &args.day;
    let key = DayKey::new(day.market.as_str(), day.code.as_str(), day.date);

    let mut warehouse = None;
    let raw = match &args.file {
        Some(path) => fs::read(path)?,
        None => {
            let opened = settings.open_warehouse()?;
            let raw = opened
                .load_raw(&key)?
                .ok_or_else(|| CliError::NotFound(format!("no raw payload stored for {key}")))?;
            warehouse = Some(opened);
            raw.json.into_bytes()
        }
    };

    let analysis = parse_daily(&day.code, &day.market, day.date, &raw)?;

    if args.save {
        let warehouse = match warehouse {
            Some(warehouse) => warehouse,
            None => settings.open_warehouse()?,
        };
        warehouse.save_analysis(&analysis)?;
        info!(%key, bars = analysis.bar_count(), "analysis saved");
    }

    Ok(serde_json::to_value(&analysis)?)
}
