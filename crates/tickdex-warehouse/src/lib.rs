//! # Tickdex Warehouse
//!
//! DuckDB-based time-series store for tickdex.
//!
//! ## Overview
//!
//! The warehouse keeps named *entries* of two kinds:
//!
//! - **series**: a time series with one or more named `DOUBLE` columns
//! - **tag**: a label that other entries can be attached to
//!
//! Tags are entries themselves, so a tag can carry other tags. tickdex uses the
//! meta-tag `@tags` to enumerate every tag of interest.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tickdex_warehouse::{SeriesPoint, Warehouse, WarehouseConfig};
//! use time::{Duration, OffsetDateTime};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open(WarehouseConfig::in_memory())?;
//!
//!     warehouse.create_series("AAPL", &["value"])?;
//!     warehouse.attach_tag("AAPL", "@products")?;
//!
//!     let now = OffsetDateTime::now_utc();
//!     warehouse.ingest_points("AAPL", "value", &[SeriesPoint::new(now - Duration::minutes(1), 150.0)])?;
//!
//!     let last = warehouse.query_last_value("AAPL", "value", now - Duration::days(1), now)?;
//!     assert_eq!(last, Some(150.0));
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `entries` | Every named entry and its kind |
//! | `series_columns` | Columns declared on each series |
//! | `series_points` | Timestamped values per series column |
//! | `entry_tags` | Entry to tag attachments |

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, OptionalExt, ToSql};
use thiserror::Error;
use time::{OffsetDateTime, UtcOffset};

pub use duckdb::{DuckDbConnectionManager, PooledConnection, IN_MEMORY_PATH};

/// URL scheme accepted by [`WarehouseConfig::from_url`].
pub const URL_SCHEME: &str = "duckdb://";

const KIND_SERIES: &str = "series";
const KIND_TAG: &str = "tag";
const COLUMN_TYPE_DOUBLE: &str = "double";

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The requested tag has never been created.
    #[error("tag '{0}' does not exist")]
    TagNotFound(String),

    /// The requested entry has never been created.
    #[error("entry '{0}' does not exist")]
    EntryNotFound(String),

    /// The series exists but does not declare the column.
    #[error("column '{column}' does not exist on entry '{entry}'")]
    ColumnNotFound { entry: String, column: String },

    /// The store endpoint could not be understood.
    #[error("invalid store endpoint '{0}', expected duckdb://<path> or a file path")]
    InvalidEndpoint(String),

    /// Request was rejected before reaching the database.
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for tickdex data.
    pub tickdex_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let tickdex_home = resolve_tickdex_home();
        let db_path = tickdex_home.join("cache").join("warehouse.duckdb");
        Self {
            tickdex_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

impl WarehouseConfig {
    /// Private in-memory database, mostly useful for tests and demos.
    pub fn in_memory() -> Self {
        Self {
            db_path: PathBuf::from(IN_MEMORY_PATH),
            ..Self::default()
        }
    }

    /// Build a configuration from a store endpoint.
    ///
    /// Accepts `duckdb://<path>`, `duckdb://:memory:` or a bare file path.
    pub fn from_url(url: &str) -> Result<Self, WarehouseError> {
        let trimmed = url.trim();
        let path = trimmed.strip_prefix(URL_SCHEME).unwrap_or(trimmed);
        if path.is_empty() || path.contains("://") {
            return Err(WarehouseError::InvalidEndpoint(url.to_string()));
        }

        Ok(Self {
            db_path: PathBuf::from(path),
            ..Self::default()
        })
    }

    /// Whether this configuration targets an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.db_path.as_os_str() == IN_MEMORY_PATH
    }
}

/// One timestamped value of a series column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub ts: OffsetDateTime,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(ts: OffsetDateTime, value: f64) -> Self {
        Self { ts, value }
    }
}

/// The main warehouse interface for time-series storage.
#[derive(Clone)]
pub struct Warehouse {
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse from a store endpoint such as `duckdb:///var/lib/tickdex.duckdb`.
    pub fn open_url(url: &str) -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::from_url(url)?)
    }

    /// Open a warehouse with the specified configuration.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if !config.is_in_memory() {
            if let Some(parent) = config.db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
        }

        let manager = DuckDbConnectionManager::open(config.db_path.clone(), config.max_pool_size)?;
        let warehouse = Self { manager };
        warehouse.initialize()?;
        log::debug!("warehouse opened at {}", warehouse.db_path().display());
        Ok(warehouse)
    }

    /// Initialize database schema.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Create a series with the given `DOUBLE` columns.
    ///
    /// An existing series of the same name is replaced in one transaction: its
    /// points, tag attachments and undeclared columns are dropped. If any step
    /// fails the previous series is left untouched.
    pub fn create_series(&self, name: &str, columns: &[&str]) -> Result<(), WarehouseError> {
        validate_name("series name", name)?;
        if columns.is_empty() {
            return Err(WarehouseError::Rejected(format!(
                "series '{name}' must declare at least one column"
            )));
        }
        for column in columns {
            validate_name("column name", column)?;
        }

        let connection = self.manager.acquire()?;
        if entry_kind(&connection, name)?.as_deref() == Some(KIND_TAG) {
            return Err(WarehouseError::Rejected(format!(
                "'{name}' is a tag and cannot be replaced by a series"
            )));
        }

        let existing = declared_columns(&connection, name)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            // Keys that survive a replacement are kept in place, never deleted and reinserted.
            let params: [&dyn ToSql; 1] = [&name];
            connection.execute("DELETE FROM series_points WHERE entry = ?", params.as_slice())?;
            connection.execute("DELETE FROM entry_tags WHERE entry = ?", params.as_slice())?;

            for stale in existing.iter().filter(|column| !columns.contains(&column.as_str())) {
                let params: [&dyn ToSql; 2] = [&name, stale];
                connection.execute(
                    "DELETE FROM series_columns WHERE entry = ? AND column_name = ?",
                    params.as_slice(),
                )?;
            }

            let params: [&dyn ToSql; 2] = [&name, &KIND_SERIES];
            connection.execute(
                "INSERT OR IGNORE INTO entries (name, kind, created_at) \
                 VALUES (?, ?, CURRENT_TIMESTAMP)",
                params.as_slice(),
            )?;
            let params: [&dyn ToSql; 1] = [&name];
            connection.execute(
                "UPDATE entries SET created_at = CURRENT_TIMESTAMP WHERE name = ?",
                params.as_slice(),
            )?;

            for column in columns {
                let params: [&dyn ToSql; 3] = [&name, column, &COLUMN_TYPE_DOUBLE];
                connection.execute(
                    "INSERT OR IGNORE INTO series_columns (entry, column_name, column_type) \
                     VALUES (?, ?, ?)",
                    params.as_slice(),
                )?;
            }

            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// Remove an entry with its points and tag attachments.
    ///
    /// Returns `false` if no such entry existed.
    pub fn remove_entry(&self, name: &str) -> Result<bool, WarehouseError> {
        let connection = self.manager.acquire()?;
        if entry_kind(&connection, name)?.is_none() {
            return Ok(false);
        }

        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = delete_entry(&connection, name).map(|()| true);
        finalize_transaction(&connection, result)
    }

    /// Attach `tag` to an existing entry, creating the tag on first use.
    ///
    /// Returns `true` if the attachment is new.
    pub fn attach_tag(&self, entry: &str, tag: &str) -> Result<bool, WarehouseError> {
        validate_name("tag", tag)?;

        let connection = self.manager.acquire()?;
        if entry_kind(&connection, entry)?.is_none() {
            return Err(WarehouseError::EntryNotFound(entry.to_string()));
        }
        match entry_kind(&connection, tag)?.as_deref() {
            Some(KIND_TAG) | None => {}
            Some(_) => {
                return Err(WarehouseError::Rejected(format!(
                    "'{tag}' is a series and cannot be used as a tag"
                )))
            }
        }

        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<bool, WarehouseError> {
            let params: [&dyn ToSql; 2] = [&tag, &KIND_TAG];
            connection.execute(
                "INSERT OR IGNORE INTO entries (name, kind, created_at) \
                 VALUES (?, ?, CURRENT_TIMESTAMP)",
                params.as_slice(),
            )?;

            let params: [&dyn ToSql; 2] = [&entry, &tag];
            let inserted = connection.execute(
                "INSERT OR IGNORE INTO entry_tags (entry, tag) VALUES (?, ?)",
                params.as_slice(),
            )?;
            Ok(inserted > 0)
        })();

        finalize_transaction(&connection, result)
    }

    /// List the names of all entries carrying `tag`, ordered by name.
    pub fn list_entries_by_tag(&self, tag: &str) -> Result<Vec<String>, WarehouseError> {
        let connection = self.manager.acquire()?;
        if entry_kind(&connection, tag)?.as_deref() != Some(KIND_TAG) {
            return Err(WarehouseError::TagNotFound(tag.to_string()));
        }

        let params: [&dyn ToSql; 1] = [&tag];
        let mut statement =
            connection.prepare("SELECT entry FROM entry_tags WHERE tag = ? ORDER BY entry")?;
        let entries = statement
            .query_map(params.as_slice(), |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Append points to a series column in a single transaction.
    ///
    /// A point with the same timestamp as an existing one replaces it.
    pub fn ingest_points(
        &self,
        entry: &str,
        column: &str,
        points: &[SeriesPoint],
    ) -> Result<usize, WarehouseError> {
        if points.is_empty() {
            return Ok(0);
        }
        if let Some(point) = points.iter().find(|point| !point.value.is_finite()) {
            return Err(WarehouseError::Rejected(format!(
                "non-finite value {} for '{entry}.{column}'",
                point.value
            )));
        }

        let connection = self.manager.acquire()?;
        ensure_column(&connection, entry, column)?;

        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            for point in points {
                let ts = to_sql_timestamp(point.ts);
                let params: [&dyn ToSql; 4] = [&entry, &column, &ts, &point.value];
                connection.execute(
                    "INSERT OR REPLACE INTO series_points (entry, column_name, ts, value) \
                     VALUES (?, ?, CAST(? AS TIMESTAMP), ?)",
                    params.as_slice(),
                )?;
            }
            Ok(points.len())
        })();

        finalize_transaction(&connection, result)
    }

    /// Last recorded value of `entry.column` with a timestamp in `[start, end)`.
    ///
    /// Returns `Ok(None)` when the series exists but has no point in the window.
    pub fn query_last_value(
        &self,
        entry: &str,
        column: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Option<f64>, WarehouseError> {
        let connection = self.manager.acquire()?;
        ensure_column(&connection, entry, column)?;

        let start = to_sql_timestamp(start);
        let end = to_sql_timestamp(end);
        let params: [&dyn ToSql; 4] = [&entry, &column, &start, &end];
        let value = connection
            .query_row(
                "SELECT value FROM series_points \
                 WHERE entry = ? AND column_name = ? \
                   AND ts >= CAST(? AS TIMESTAMP) AND ts < CAST(? AS TIMESTAMP) \
                 ORDER BY ts DESC LIMIT 1",
                params.as_slice(),
                |row| row.get::<_, f64>(0),
            )
            .optional()?;
        Ok(value)
    }
}

/// Finalize a transaction, committing on success or rolling back on failure.
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

/// Kind of the named entry, if it exists.
fn entry_kind(connection: &Connection, name: &str) -> Result<Option<String>, WarehouseError> {
    let params: [&dyn ToSql; 1] = [&name];
    let kind = connection
        .query_row(
            "SELECT kind FROM entries WHERE name = ?",
            params.as_slice(),
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(kind)
}

/// Columns currently declared by `entry`.
fn declared_columns(connection: &Connection, entry: &str) -> Result<Vec<String>, WarehouseError> {
    let mut statement =
        connection.prepare("SELECT column_name FROM series_columns WHERE entry = ?")?;
    let params: [&dyn ToSql; 1] = [&entry];
    let rows = statement.query_map(params.as_slice(), |row| row.get::<_, String>(0))?;
    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }
    Ok(columns)
}

/// Fail unless `entry` is a series declaring `column`.
fn ensure_column(connection: &Connection, entry: &str, column: &str) -> Result<(), WarehouseError> {
    if entry_kind(connection, entry)?.as_deref() != Some(KIND_SERIES) {
        return Err(WarehouseError::EntryNotFound(entry.to_string()));
    }

    let params: [&dyn ToSql; 2] = [&entry, &column];
    let declared: i64 = connection.query_row(
        "SELECT COUNT(*) FROM series_columns WHERE entry = ? AND column_name = ?",
        params.as_slice(),
        |row| row.get(0),
    )?;
    if declared == 0 {
        return Err(WarehouseError::ColumnNotFound {
            entry: entry.to_string(),
            column: column.to_string(),
        });
    }
    Ok(())
}

/// Delete every row belonging to an entry. Must run inside a transaction.
fn delete_entry(connection: &Connection, name: &str) -> Result<(), WarehouseError> {
    let params: [&dyn ToSql; 1] = [&name];
    connection.execute("DELETE FROM series_points WHERE entry = ?", params.as_slice())?;
    connection.execute("DELETE FROM series_columns WHERE entry = ?", params.as_slice())?;
    connection.execute("DELETE FROM entry_tags WHERE entry = ?", params.as_slice())?;
    connection.execute("DELETE FROM entries WHERE name = ?", params.as_slice())?;
    Ok(())
}

fn validate_name(what: &str, value: &str) -> Result<(), WarehouseError> {
    if value.trim().is_empty() {
        return Err(WarehouseError::Rejected(format!("{what} must not be empty")));
    }
    Ok(())
}

/// Render a timestamp as a naive UTC `TIMESTAMP` literal with microsecond precision.
fn to_sql_timestamp(ts: OffsetDateTime) -> String {
    let utc = ts.to_offset(UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
        utc.year(),
        u8::from(utc.month()),
        utc.day(),
        utc.hour(),
        utc.minute(),
        utc.second(),
        utc.microsecond()
    )
}

/// Resolve the tickdex home directory from environment or default.
fn resolve_tickdex_home() -> PathBuf {
    if let Some(path) = env::var_os("TICKDEX_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".tickdex");
    }

    PathBuf::from(".tickdex")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::Duration;

    fn warehouse() -> Warehouse {
        Warehouse::open(WarehouseConfig::in_memory()).expect("warehouse open")
    }

    #[test]
    fn opening_a_file_store_creates_missing_directories() {
        let temp = tempfile::tempdir().expect("tempdir");
        let db_path = temp.path().join("nested").join("cache").join("warehouse.duckdb");

        let warehouse = Warehouse::open(WarehouseConfig {
            tickdex_home: temp.path().to_path_buf(),
            db_path: db_path.clone(),
            max_pool_size: 1,
        })
        .expect("warehouse open");

        assert_eq!(warehouse.db_path(), db_path.as_path());
        assert!(db_path.exists());
    }

    #[test]
    fn timestamps_are_rendered_in_utc() {
        let ts = datetime!(2026-02-20 10:00:00.123456 +02:00);
        assert_eq!(to_sql_timestamp(ts), "2026-02-20 08:00:00.123456");
    }

    #[test]
    fn endpoint_accepts_scheme_and_bare_paths() {
        let config = WarehouseConfig::from_url("duckdb:///tmp/tickdex.duckdb").expect("url");
        assert_eq!(config.db_path, PathBuf::from("/tmp/tickdex.duckdb"));

        let config = WarehouseConfig::from_url("data/store.duckdb").expect("path");
        assert_eq!(config.db_path, PathBuf::from("data/store.duckdb"));

        assert!(WarehouseConfig::from_url("duckdb://:memory:")
            .expect("memory")
            .is_in_memory());
    }

    #[test]
    fn endpoint_rejects_foreign_schemes() {
        let error = WarehouseConfig::from_url("qdb://127.0.0.1:2836").expect_err("must fail");
        assert!(matches!(error, WarehouseError::InvalidEndpoint(_)));

        let error = WarehouseConfig::from_url("duckdb://").expect_err("must fail");
        assert!(matches!(error, WarehouseError::InvalidEndpoint(_)));
    }

    #[test]
    fn tags_cannot_be_replaced_by_series() {
        let warehouse = warehouse();
        warehouse.create_series("DJIA", &["value"]).expect("series");
        warehouse.attach_tag("DJIA", "@indexes").expect("tag");

        let error = warehouse
            .create_series("@indexes", &["value"])
            .expect_err("must reject");
        assert!(matches!(error, WarehouseError::Rejected(_)));
    }

    #[test]
    fn attaching_the_same_tag_twice_is_idempotent() {
        let warehouse = warehouse();
        warehouse.create_series("AAPL", &["value"]).expect("series");

        assert!(warehouse.attach_tag("AAPL", "@products").expect("first"));
        assert!(!warehouse.attach_tag("AAPL", "@products").expect("second"));
        assert_eq!(
            warehouse.list_entries_by_tag("@products").expect("list"),
            vec!["AAPL".to_string()]
        );
    }

    #[test]
    fn ingest_rejects_non_finite_values() {
        let warehouse = warehouse();
        warehouse.create_series("AAPL", &["value"]).expect("series");

        let error = warehouse
            .ingest_points(
                "AAPL",
                "value",
                &[SeriesPoint::new(OffsetDateTime::now_utc(), f64::NAN)],
            )
            .expect_err("must reject");
        assert!(matches!(error, WarehouseError::Rejected(_)));
    }

    #[test]
    fn query_on_unknown_column_reports_column_not_found() {
        let warehouse = warehouse();
        warehouse.create_series("AAPL", &["value"]).expect("series");

        let now = OffsetDateTime::now_utc();
        let error = warehouse
            .query_last_value("AAPL", "volume", now - Duration::days(1), now)
            .expect_err("must fail");
        assert!(matches!(error, WarehouseError::ColumnNotFound { .. }));
    }
}
