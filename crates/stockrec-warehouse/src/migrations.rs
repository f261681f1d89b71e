use ::duckdb::{params, Connection};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_raw_and_results",
        sql: r#"
CREATE TABLE IF NOT EXISTS raw_payloads (
    market TEXT NOT NULL,
    code TEXT NOT NULL,
    date DATE NOT NULL,
    json TEXT NOT NULL,
    status INTEGER NOT NULL DEFAULT 0,
    message TEXT NOT NULL DEFAULT '',
    fetched_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY(market, code, date)
);

CREATE TABLE IF NOT EXISTS daily_results (
    market TEXT NOT NULL,
    code TEXT NOT NULL,
    date DATE NOT NULL,
    error BOOLEAN NOT NULL,
    message TEXT NOT NULL,
    pre_count INTEGER NOT NULL,
    regular_count INTEGER NOT NULL,
    post_count INTEGER NOT NULL,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY(market, code, date)
);

CREATE TABLE IF NOT EXISTS minute_bars (
    market TEXT NOT NULL,
    code TEXT NOT NULL,
    date DATE NOT NULL,
    session TEXT NOT NULL,
    seq INTEGER NOT NULL,
    start_ts BIGINT NOT NULL,
    end_ts BIGINT NOT NULL,
    open DOUBLE NOT NULL,
    close DOUBLE NOT NULL,
    high DOUBLE NOT NULL,
    low DOUBLE NOT NULL,
    volume BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS ingest_log (
    request_id TEXT NOT NULL,
    market TEXT NOT NULL,
    code TEXT NOT NULL,
    date DATE NOT NULL,
    stage TEXT NOT NULL,
    status TEXT NOT NULL,
    message TEXT,
    timestamp TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_minute_bars_day ON minute_bars(market, code, date);
CREATE INDEX IF NOT EXISTS idx_ingest_log_day ON ingest_log(market, code, date);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params![migration.version],
            |row| row.get(0),
        )?;

        if applied == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params![migration.version],
            )?;
        }
    }

    Ok(())
}
