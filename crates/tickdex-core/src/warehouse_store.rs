//! [`TimeSeriesStore`] backed by the DuckDB warehouse.
//!
//! Warehouse calls are synchronous, so every request runs on the blocking
//! thread pool and the async caller only awaits the join handle.

use tickdex_warehouse::{Warehouse, WarehouseError};

use crate::store::{StoreError, StoreFuture, TimeSeriesStore};
use crate::{AggregationWindow, Tag};

/// Store adapter over a [`Warehouse`] handle.
#[derive(Clone)]
pub struct WarehouseStore {
    warehouse: Warehouse,
}

impl WarehouseStore {
    pub fn new(warehouse: Warehouse) -> Self {
        Self { warehouse }
    }

    /// Open the warehouse behind a store endpoint such as `duckdb://./data/tickdex.duckdb`.
    pub fn connect(endpoint: &str) -> Result<Self, StoreError> {
        let warehouse = Warehouse::open_url(endpoint).map_err(store_error)?;
        log::info!("connected to store at {}", warehouse.db_path().display());
        Ok(Self::new(warehouse))
    }

    async fn blocking<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(Warehouse) -> Result<T, WarehouseError> + Send + 'static,
    {
        let warehouse = self.warehouse.clone();
        tokio::task::spawn_blocking(move || operation(warehouse))
            .await
            .map_err(|error| StoreError::Unavailable(format!("store task failed: {error}")))?
            .map_err(store_error)
    }
}

impl TimeSeriesStore for WarehouseStore {
    fn list_entries_by_tag<'a>(&'a self, tag: &'a Tag) -> StoreFuture<'a, Vec<String>> {
        Box::pin(async move {
            let tag = tag.as_str().to_string();
            self.blocking(move |warehouse| warehouse.list_entries_by_tag(&tag))
                .await
        })
    }

    fn query_last_value<'a>(
        &'a self,
        entry: &'a str,
        column: &'a str,
        window: AggregationWindow,
    ) -> StoreFuture<'a, Option<f64>> {
        Box::pin(async move {
            let entry = entry.to_string();
            let column = column.to_string();
            self.blocking(move |warehouse| {
                warehouse.query_last_value(&entry, &column, window.start(), window.end())
            })
            .await
        })
    }
}

fn store_error(error: WarehouseError) -> StoreError {
    match error {
        WarehouseError::TagNotFound(tag) => StoreError::TagNotFound(tag),
        WarehouseError::EntryNotFound(entry) => StoreError::EntryNotFound(entry),
        WarehouseError::ColumnNotFound { entry, column } => {
            StoreError::ColumnNotFound { entry, column }
        }
        other => StoreError::Unavailable(other.to_string()),
    }
}
