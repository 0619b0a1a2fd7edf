//! Time-series store contract and the in-memory implementation.
//!
//! The index pipeline only needs two read operations from a store:
//!
//! | Operation | Description |
//! |-----------|-------------|
//! | [`list_entries_by_tag`](TimeSeriesStore::list_entries_by_tag) | Names of all entries carrying a tag |
//! | [`query_last_value`](TimeSeriesStore::query_last_value) | Last value of a column inside a window |
//!
//! [`InMemoryStore`] keeps everything in process memory and supports failure
//! injection, which makes it the store of choice for tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use time::OffsetDateTime;

use crate::{truncate_to_micros, AggregationWindow, Tag};

/// Column read by the value fetcher.
pub const VALUE_COLUMN: &str = "value";

/// Store-level failure classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0}")]
    Unavailable(String),
    #[error("tag '{0}' does not exist")]
    TagNotFound(String),
    #[error("entry '{0}' does not exist")]
    EntryNotFound(String),
    #[error("column '{column}' does not exist on entry '{entry}'")]
    ColumnNotFound { entry: String, column: String },
}

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Read access to a tagged time-series store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the refresh loop shares one store
/// handle across every fetch.
///
/// # Precision
///
/// Timestamps are kept at microsecond precision. Points within the same
/// microsecond share one timestamp, and window bounds are truncated the same
/// way (see [`AggregationWindow::contains`]).
pub trait TimeSeriesStore: Send + Sync {
    /// Lists the names of all entries carrying `tag`.
    ///
    /// # Errors
    ///
    /// [`StoreError::TagNotFound`] if the tag was never created,
    /// [`StoreError::Unavailable`] on transport failure.
    fn list_entries_by_tag<'a>(&'a self, tag: &'a Tag) -> StoreFuture<'a, Vec<String>>;

    /// Returns the last recorded value of `entry.column` strictly inside `window`,
    /// or `None` if the window holds no point.
    ///
    /// # Errors
    ///
    /// [`StoreError::EntryNotFound`] / [`StoreError::ColumnNotFound`] for unknown
    /// series, [`StoreError::Unavailable`] on transport failure.
    fn query_last_value<'a>(
        &'a self,
        entry: &'a str,
        column: &'a str,
        window: AggregationWindow,
    ) -> StoreFuture<'a, Option<f64>>;
}

impl<S> TimeSeriesStore for Arc<S>
where
    S: TimeSeriesStore + ?Sized,
{
    fn list_entries_by_tag<'a>(&'a self, tag: &'a Tag) -> StoreFuture<'a, Vec<String>> {
        self.as_ref().list_entries_by_tag(tag)
    }

    fn query_last_value<'a>(
        &'a self,
        entry: &'a str,
        column: &'a str,
        window: AggregationWindow,
    ) -> StoreFuture<'a, Option<f64>> {
        self.as_ref().query_last_value(entry, column, window)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    tags: BTreeMap<String, Vec<String>>,
    series: HashMap<String, HashMap<String, Vec<(OffsetDateTime, f64)>>>,
    unavailable: bool,
    failing_entries: HashSet<String>,
}

/// Store kept entirely in memory.
///
/// Tag membership is recorded verbatim, duplicates included, so callers can
/// exercise catalog normalization.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
    queries: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `tag` to `entry`. The tag itself becomes an existing (possibly empty) group.
    pub fn tag(&self, tag: &str, entry: &str) -> &Self {
        let mut state = self.write();
        state
            .tags
            .entry(tag.to_string())
            .or_default()
            .push(entry.to_string());
        self
    }

    /// Create an empty tag group.
    pub fn create_tag(&self, tag: &str) -> &Self {
        self.write().tags.entry(tag.to_string()).or_default();
        self
    }

    /// Create a series with a `value` column and no points.
    pub fn create_series(&self, entry: &str) -> &Self {
        self.write()
            .series
            .entry(entry.to_string())
            .or_default()
            .entry(VALUE_COLUMN.to_string())
            .or_default();
        self
    }

    /// Record a point in the `value` column of `entry`, creating the series if needed.
    pub fn record(&self, entry: &str, ts: OffsetDateTime, value: f64) -> &Self {
        self.record_column(entry, VALUE_COLUMN, ts, value)
    }

    /// Record a point in an arbitrary column of `entry`.
    pub fn record_column(
        &self,
        entry: &str,
        column: &str,
        ts: OffsetDateTime,
        value: f64,
    ) -> &Self {
        self.write()
            .series
            .entry(entry.to_string())
            .or_default()
            .entry(column.to_string())
            .or_default()
            .push((truncate_to_micros(ts), value));
        self
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.write().unavailable = unavailable;
    }

    /// Make value queries for one entry fail with [`StoreError::Unavailable`].
    pub fn fail_entry(&self, entry: &str) {
        self.write().failing_entries.insert(entry.to_string());
    }

    /// Number of value queries served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn entries_by_tag(&self, tag: &Tag) -> Result<Vec<String>, StoreError> {
        let state = self.read();
        if state.unavailable {
            return Err(StoreError::Unavailable(String::from(
                "in-memory store marked unavailable",
            )));
        }
        state
            .tags
            .get(tag.as_str())
            .cloned()
            .ok_or_else(|| StoreError::TagNotFound(tag.to_string()))
    }

    fn last_value(
        &self,
        entry: &str,
        column: &str,
        window: AggregationWindow,
    ) -> Result<Option<f64>, StoreError> {
        self.queries.fetch_add(1, Ordering::Relaxed);

        let state = self.read();
        if state.unavailable || state.failing_entries.contains(entry) {
            return Err(StoreError::Unavailable(format!(
                "in-memory store refused query for '{entry}'"
            )));
        }

        let columns = state
            .series
            .get(entry)
            .ok_or_else(|| StoreError::EntryNotFound(entry.to_string()))?;
        let points = columns
            .get(column)
            .ok_or_else(|| StoreError::ColumnNotFound {
                entry: entry.to_string(),
                column: column.to_string(),
            })?;

        // Later insertions win on equal timestamps, like an upsert.
        let latest = points
            .iter()
            .enumerate()
            .filter(|(_, (ts, _))| window.contains(*ts))
            .max_by_key(|(position, (ts, _))| (*ts, *position))
            .map(|(_, (_, value))| *value);
        Ok(latest)
    }
}

impl TimeSeriesStore for InMemoryStore {
    fn list_entries_by_tag<'a>(&'a self, tag: &'a Tag) -> StoreFuture<'a, Vec<String>> {
        Box::pin(async move { self.entries_by_tag(tag) })
    }

    fn query_last_value<'a>(
        &'a self,
        entry: &'a str,
        column: &'a str,
        window: AggregationWindow,
    ) -> StoreFuture<'a, Option<f64>> {
        Box::pin(async move { self.last_value(entry, column, window) })
    }
}
