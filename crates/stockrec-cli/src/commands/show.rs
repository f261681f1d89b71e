use serde_json::Value;
use stockrec_core::DayKey;

use crate::cli::DayArgs;
use crate::error::CliError;

use super::Settings;

pub fn run(args: &DayArgs, settings: &Settings) -> Result<Value, CliError> {
    let warehouse = settings.open_warehouse()?;
    let analysis = warehouse
        .load_analysis(&args.market, &args.code, args.date)?
        .ok_or_else(|| {
            let key = DayKey::new(args.market.as_str(), args.code.as_str(), args.date);
            CliError::NotFound(format!("no analysis stored for {key}"))
        })?;

    Ok(serde_json::to_value(&analysis)?)
}
