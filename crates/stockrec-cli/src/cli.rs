//! CLI argument definitions for stockrec.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fetch` | Fetch one day of minute quotes and queue the raw payload |
//! | `parse` | Parse a raw payload into a daily analysis |
//! | `process` | Parse stored raw payloads that are still unprocessed |
//! | `show` | Print a stored daily analysis |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--home` | `$STOCKREC_HOME` or `~/.stockrec` | Warehouse directory |
//! | `--data-dir` | `$STOCKREC_DATA_DIR` | Raw-file cache root |
//! | `--chart-url` | `$STOCKREC_CHART_URL` | Chart endpoint base URL |
//! | `--retry-times` | `$STOCKREC_RETRY_TIMES` or `5` | Retries after the first fetch attempt |
//! | `--retry-interval-secs` | `$STOCKREC_RETRY_INTERVAL_SECS` or `10` | Delay between attempts |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! stockrec fetch --market america --code AAPL --date 2024-03-08 --utc-offset -05:00
//! stockrec parse --market america --code AAPL --date 2024-03-08 --file 20240308_raw.txt --pretty
//! stockrec process --limit 500
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use stockrec_core::parse_day;
use time::macros::format_description;
use time::{Date, UtcOffset};

/// Minute-quote recorder for the Yahoo Finance chart endpoint.
#[derive(Debug, Parser)]
#[command(name = "stockrec", author, version, about)]
pub struct Cli {
    /// Directory holding the warehouse database.
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Root of the raw payload file cache.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the chart endpoint.
    #[arg(long, global = true)]
    pub chart_url: Option<String>,

    /// Retries after the first fetch attempt.
    #[arg(long, global = true)]
    pub retry_times: Option<u32>,

    /// Seconds to wait between fetch attempts.
    #[arg(long, global = true)]
    pub retry_interval_secs: Option<u64>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one day of minute quotes unless it is already stored.
    Fetch(FetchArgs),

    /// Parse a raw payload and print the daily analysis.
    ///
    /// Reads `--file` when given, otherwise the stored raw payload.
    Parse(ParseArgs),

    /// Parse stored raw payloads that have not been processed yet.
    Process(ProcessArgs),

    /// Print the stored analysis for a day.
    Show(DayArgs),
}

/// Identity of one stored day.
#[derive(Debug, Args)]
pub struct DayArgs {
    /// Exchange name, e.g. `america`.
    #[arg(long)]
    pub market: String,

    /// Company code as stored.
    #[arg(long)]
    pub code: String,

    /// Local trading day, `YYYY-MM-DD`.
    #[arg(long, value_parser = parse_date_arg)]
    pub date: Date,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub day: DayArgs,

    /// Symbol as the chart endpoint knows it. Defaults to `--code`.
    #[arg(long)]
    pub query_code: Option<String>,

    /// Exchange UTC offset used to place the day's midnight, `+HH:MM`.
    #[arg(long, value_parser = parse_offset_arg, default_value = "+00:00", allow_hyphen_values = true)]
    pub utc_offset: UtcOffset,
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    #[command(flatten)]
    pub day: DayArgs,

    /// Raw payload file to parse.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Save the analysis to the warehouse.
    #[arg(long, default_value_t = false)]
    pub save: bool,
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Maximum number of raw payloads to parse.
    #[arg(long, default_value_t = 100)]
    pub limit: usize,
}

fn parse_date_arg(value: &str) -> Result<Date, String> {
    parse_day(value).map_err(|error| format!("expected YYYY-MM-DD: {error}"))
}

fn parse_offset_arg(value: &str) -> Result<UtcOffset, String> {
    UtcOffset::parse(
        value.trim(),
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .map_err(|error| format!("expected +HH:MM: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, offset};

    #[test]
    fn fetch_accepts_negative_offsets() {
        let cli = Cli::try_parse_from([
            "stockrec",
            "fetch",
            "--market",
            "america",
            "--code",
            "BRK-B",
            "--query-code",
            "BRK.B",
            "--date",
            "2024-03-08",
            "--utc-offset",
            "-05:00",
        ])
        .expect("parse");

        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.day.date, date!(2024 - 03 - 08));
        assert_eq!(args.utc_offset, offset!(-5));
        assert_eq!(args.query_code.as_deref(), Some("BRK.B"));
    }

    #[test]
    fn offset_defaults_to_utc() {
        let cli = Cli::try_parse_from([
            "stockrec", "fetch", "--market", "america", "--code", "AAPL", "--date", "2024-03-08",
        ])
        .expect("parse");

        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.utc_offset, UtcOffset::UTC);
    }

    #[test]
    fn malformed_date_is_rejected() {
        let result = Cli::try_parse_from([
            "stockrec", "show", "--market", "america", "--code", "AAPL", "--date", "08/03/2024",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_options_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["stockrec", "process", "--limit", "5", "--home", "/tmp/sr"])
            .expect("parse");

        assert_eq!(cli.home, Some(PathBuf::from("/tmp/sr")));
        assert!(matches!(cli.command, Command::Process(ProcessArgs { limit: 5 })));
    }
}
