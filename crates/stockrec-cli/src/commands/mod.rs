mod fetch;
mod parse;
mod process;
mod show;

use std::time::Duration;

use serde_json::Value;
use stockrec_core::{IngestConfig, RetryConfig};
use stockrec_warehouse::{Warehouse, WarehouseConfig};

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Settings resolved from the environment, then overridden by flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub ingest: IngestConfig,
    pub warehouse: WarehouseConfig,
}

impl Settings {
    pub fn resolve(cli: &Cli) -> Result<Self, CliError> {
        let mut ingest = IngestConfig::from_env()?;
        if let Some(url) = &cli.chart_url {
            ingest.chart_base_url = url.clone();
        }
        if cli.retry_times.is_some() || cli.retry_interval_secs.is_some() {
            let max_retries = cli.retry_times.unwrap_or(ingest.retry.max_retries);
            let delay = cli
                .retry_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(ingest.retry.delay);
            ingest.retry = RetryConfig::fixed(delay, max_retries);
        }
        if let Some(dir) = &cli.data_dir {
            ingest.data_dir = Some(dir.clone());
        }

        let warehouse = match &cli.home {
            Some(home) => WarehouseConfig::in_home(home.clone()),
            None => WarehouseConfig::default(),
        };

        Ok(Self { ingest, warehouse })
    }

    pub fn open_warehouse(&self) -> Result<Warehouse, CliError> {
        Ok(Warehouse::open(self.warehouse.clone())?)
    }
}

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    let settings = Settings::resolve(cli)?;

    match &cli.command {
        Command::Fetch(args) => fetch::run(args, &settings).await,
        Command::Parse(args) => parse::run(args, &settings),
        Command::Process(args) => process::run(args, &settings),
        Command::Show(args) => show::run(args, &settings),
    }
}
