//! # Stockrec Warehouse
//!
//! DuckDB storage for fetched chart payloads and the analyses derived from
//! them.
//!
//! ## Overview
//!
//! - **Raw payloads**: one row per `(market, code, date)`, written once
//! - **Save queue**: non-blocking hand-off from fetch tasks to a single writer
//! - **Daily results**: per-day outcome plus its minute bars in session order
//! - **Reprocessing**: parse stored raw payloads that have not been parsed yet
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stockrec_warehouse::{process_pending, Warehouse};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_default()?;
//!     let report = process_pending(&warehouse, 100)?;
//!     println!("processed {} raw payloads", report.processed);
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `raw_payloads` | Unparsed chart responses and their processing status |
//! | `daily_results` | Parse outcome per day |
//! | `minute_bars` | Classified bars, ordered by `seq` within a session |
//! | `ingest_log` | Audit trail of raw writes and parse runs |

pub mod duckdb;
pub mod migrations;
pub mod queue;
pub mod reprocess;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, ToSql};
use stockrec_core::{
    parse_day, AnalysisSink, DailyAnalysis, DayKey, MinuteBar, RawPayload, RawStatus,
    StoreError, TradingSession,
};
use thiserror::Error;
use time::Date;

pub use duckdb::{AccessMode, DuckDbConnectionManager, PooledConnection};
pub use queue::{QueuedStore, SaveQueue, SaveQueueReport};
pub use reprocess::{process_pending, ReprocessReport};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A stored row could not be mapped back to a domain value.
    #[error("invalid stored row for {key}: {reason}")]
    InvalidRow { key: String, reason: String },
}

impl From<WarehouseError> for StoreError {
    fn from(error: WarehouseError) -> Self {
        StoreError::new(error.to_string())
    }
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for stockrec state.
    pub stockrec_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept per access mode.
    pub max_pool_size: usize,
}

impl WarehouseConfig {
    pub fn in_home(stockrec_home: impl Into<PathBuf>) -> Self {
        let stockrec_home = stockrec_home.into();
        let db_path = stockrec_home.join("warehouse.duckdb");
        Self {
            stockrec_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::in_home(resolve_stockrec_home())
    }
}

/// One `ingest_log` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestLogEntry {
    pub request_id: String,
    pub stage: String,
    pub status: String,
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::new(config.db_path.clone(), config.max_pool_size);
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Whether a raw payload for the day is stored, whatever its status.
    pub fn raw_exists(&self, market: &str, code: &str, date: Date) -> Result<bool, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        raw_count(&connection, market, code, &date.to_string()).map(|count| count > 0)
    }

    /// Store a raw payload unless the day already has one.
    ///
    /// Returns `true` when the row was written, `false` for a duplicate. Both
    /// outcomes are recorded in `ingest_log` under `request_id`.
    pub fn insert_raw(&self, raw: &RawPayload, request_id: &str) -> Result<bool, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        let day = raw.date.to_string();
        let status = raw.status.code();

        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<bool, WarehouseError> {
            let inserted = raw_count(&connection, &raw.market, &raw.code, &day)? == 0;
            if inserted {
                let params: [&dyn ToSql; 6] = [
                    &raw.market,
                    &raw.code,
                    &day,
                    &raw.json,
                    &status,
                    &raw.message,
                ];
                connection.execute(
                    "INSERT OR IGNORE INTO raw_payloads \
                     (market, code, date, json, status, message, fetched_at) \
                     VALUES (?, ?, CAST(? AS DATE), ?, ?, ?, CURRENT_TIMESTAMP)",
                    params.as_slice(),
                )?;
            }

            let outcome = if inserted { "stored" } else { "duplicate" };
            log_event(&connection, request_id, &raw.market, &raw.code, &day, "fetch", outcome, None)?;
            Ok(inserted)
        })();

        finalize_transaction(&connection, result)
    }

    pub fn load_raw(&self, key: &DayKey) -> Result<Option<RawPayload>, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let day = key.date.to_string();
        let params: [&dyn ToSql; 3] = [&key.market, &key.code, &day];
        let mut rows = query_raws(
            &connection,
            "SELECT market, code, CAST(date AS VARCHAR), json, status, message FROM raw_payloads \
             WHERE market = ? AND code = ? AND date = CAST(? AS DATE)",
            params.as_slice(),
        )?;
        Ok(rows.pop())
    }

    /// Up to `limit` raw payloads still awaiting a parse, oldest day first.
    pub fn pending_raws(&self, limit: usize) -> Result<Vec<RawPayload>, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let status = RawStatus::Unprocessed.code();
        let params: [&dyn ToSql; 1] = [&status];
        let sql = format!(
            "SELECT market, code, CAST(date AS VARCHAR), json, status, message FROM raw_payloads \
             WHERE status = ? ORDER BY date, market, code LIMIT {limit}"
        );
        query_raws(&connection, &sql, params.as_slice())
    }

    /// Record the parse outcome of a stored raw payload.
    pub fn mark_raw(
        &self,
        key: &DayKey,
        status: RawStatus,
        message: &str,
        request_id: &str,
    ) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        let day = key.date.to_string();
        let code = status.code();

        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            let params: [&dyn ToSql; 5] = [&code, &message, &key.market, &key.code, &day];
            connection.execute(
                "UPDATE raw_payloads SET status = ?, message = ? \
                 WHERE market = ? AND code = ? AND date = CAST(? AS DATE)",
                params.as_slice(),
            )?;

            let note = (!message.is_empty()).then_some(message);
            log_event(
                &connection,
                request_id,
                &key.market,
                &key.code,
                &day,
                "parse",
                status_label(status),
                note,
            )?;
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// Replace the stored result and bars for the analysis' day.
    pub fn save_analysis(&self, analysis: &DailyAnalysis) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        let day = analysis.date.to_string();
        let counts = [
            analysis.pre.len() as i64,
            analysis.regular.len() as i64,
            analysis.post.len() as i64,
        ];

        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            let params: [&dyn ToSql; 8] = [
                &analysis.market,
                &analysis.code,
                &day,
                &analysis.error,
                &analysis.message,
                &counts[0],
                &counts[1],
                &counts[2],
            ];
            connection.execute(
                "INSERT OR REPLACE INTO daily_results \
                 (market, code, date, error, message, pre_count, regular_count, post_count, updated_at) \
                 VALUES (?, ?, CAST(? AS DATE), ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
                params.as_slice(),
            )?;

            let params: [&dyn ToSql; 3] = [&analysis.market, &analysis.code, &day];
            connection.execute(
                "DELETE FROM minute_bars WHERE market = ? AND code = ? AND date = CAST(? AS DATE)",
                params.as_slice(),
            )?;

            let mut insert = connection.prepare(
                "INSERT INTO minute_bars \
                 (market, code, date, session, seq, start_ts, end_ts, open, close, high, low, volume) \
                 VALUES (?, ?, CAST(? AS DATE), ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for session in TradingSession::ALL {
                let label = session.as_str();
                for (seq, bar) in analysis.bars(session).iter().enumerate() {
                    let seq = seq as i64;
                    let params: [&dyn ToSql; 12] = [
                        &analysis.market,
                        &analysis.code,
                        &day,
                        &label,
                        &seq,
                        &bar.start,
                        &bar.end,
                        &bar.open,
                        &bar.close,
                        &bar.high,
                        &bar.low,
                        &bar.volume,
                    ];
                    insert.execute(params.as_slice())?;
                }
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// Stored analysis for the day, bars in their original session order.
    pub fn load_analysis(
        &self,
        market: &str,
        code: &str,
        date: Date,
    ) -> Result<Option<DailyAnalysis>, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let day = date.to_string();
        let params: [&dyn ToSql; 3] = [&market, &code, &day];

        let mut statement = connection.prepare(
            "SELECT error, message FROM daily_results \
             WHERE market = ? AND code = ? AND date = CAST(? AS DATE)",
        )?;
        let header = statement
            .query_map(params.as_slice(), |row| {
                Ok((row.get::<_, bool>(0)?, row.get::<_, String>(1)?))
            })?
            .next()
            .transpose()?;
        let Some((error, message)) = header else {
            return Ok(None);
        };

        let mut analysis = DailyAnalysis::new(code, market, date);
        analysis.error = error;
        analysis.message = message;

        let mut statement = connection.prepare(
            "SELECT session, start_ts, end_ts, open, close, high, low, volume FROM minute_bars \
             WHERE market = ? AND code = ? AND date = CAST(? AS DATE) ORDER BY seq",
        )?;
        let rows = statement
            .query_map(params.as_slice(), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    MinuteBar {
                        code: code.to_owned(),
                        market: market.to_owned(),
                        start: row.get(1)?,
                        end: row.get(2)?,
                        open: row.get(3)?,
                        close: row.get(4)?,
                        high: row.get(5)?,
                        low: row.get(6)?,
                        volume: row.get(7)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (label, bar) in rows {
            let session = TradingSession::parse(&label).ok_or_else(|| WarehouseError::InvalidRow {
                key: DayKey::new(market, code, date).to_string(),
                reason: format!("unknown session '{label}'"),
            })?;
            analysis.push(session, bar);
        }

        Ok(Some(analysis))
    }

    /// `ingest_log` rows for the day in insertion order.
    pub fn ingest_log(&self, key: &DayKey) -> Result<Vec<IngestLogEntry>, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let day = key.date.to_string();
        let params: [&dyn ToSql; 3] = [&key.market, &key.code, &day];
        let mut statement = connection.prepare(
            "SELECT request_id, stage, status, message FROM ingest_log \
             WHERE market = ? AND code = ? AND date = CAST(? AS DATE) ORDER BY rowid",
        )?;
        let entries = statement
            .query_map(params.as_slice(), |row| {
                Ok(IngestLogEntry {
                    request_id: row.get(0)?,
                    stage: row.get(1)?,
                    status: row.get(2)?,
                    message: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

impl AnalysisSink for Warehouse {
    fn save(&self, analysis: &DailyAnalysis) -> Result<(), StoreError> {
        Ok(self.save_analysis(analysis)?)
    }
}

const fn status_label(status: RawStatus) -> &'static str {
    match status {
        RawStatus::Unprocessed => "unprocessed",
        RawStatus::Processed => "processed",
        RawStatus::Failed => "failed",
    }
}

fn raw_count(
    connection: &Connection,
    market: &str,
    code: &str,
    day: &str,
) -> Result<i64, WarehouseError> {
    let params: [&dyn ToSql; 3] = [&market, &code, &day];
    Ok(connection.query_row(
        "SELECT COUNT(*) FROM raw_payloads WHERE market = ? AND code = ? AND date = CAST(? AS DATE)",
        params.as_slice(),
        |row| row.get(0),
    )?)
}

fn query_raws(
    connection: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<RawPayload>, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    let rows = statement
        .query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i32>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(market, code, day, json, status, message)| {
            let invalid = |reason: String| WarehouseError::InvalidRow {
                key: format!("{market}/{code}/{day}"),
                reason,
            };
            let date = parse_day(&day).map_err(|error| invalid(error.to_string()))?;
            let status = RawStatus::from_code(status)
                .ok_or_else(|| invalid(format!("unknown raw status {status}")))?;
            Ok(RawPayload {
                market,
                code,
                date,
                json,
                status,
                message,
            })
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn log_event(
    connection: &Connection,
    request_id: &str,
    market: &str,
    code: &str,
    day: &str,
    stage: &str,
    status: &str,
    message: Option<&str>,
) -> Result<(), WarehouseError> {
    let params: [&dyn ToSql; 7] = [&request_id, &market, &code, &day, &stage, &status, &message];
    connection.execute(
        "INSERT INTO ingest_log (request_id, market, code, date, stage, status, message, timestamp) \
         VALUES (?, ?, ?, CAST(? AS DATE), ?, ?, ?, CURRENT_TIMESTAMP)",
        params.as_slice(),
    )?;
    Ok(())
}

/// Commit on success, roll back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

/// `STOCKREC_HOME`, else `$HOME/.stockrec`, else `.stockrec`.
fn resolve_stockrec_home() -> PathBuf {
    if let Some(path) = env::var_os("STOCKREC_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".stockrec");
    }

    PathBuf::from(".stockrec")
}
