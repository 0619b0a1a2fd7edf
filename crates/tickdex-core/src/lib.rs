//! # Tickdex Core
//!
//! Catalog discovery, price-weighted index aggregation and the refresh loop
//! for tickdex composite indexes.
//!
//! ## Overview
//!
//! A tickdex store holds named time series grouped by tags:
//!
//! - entries tagged `@products` are instruments with a `value` column
//! - entries tagged `@indexes` are composite indexes
//! - `@tags` lists every tag worth showing in the catalog
//!
//! Every pass of the refresh loop computes, for each index, the sum of the
//! latest constituent values inside a trailing one-day window divided by the
//! index divisor, then sleeps for the configured interval.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`aggregator`] | Index computation and per-index divisors |
//! | [`catalog`] | Tag groups discovered from the store |
//! | [`clock`] | System and manual clocks |
//! | [`config`] | JSON index configuration and divisor overrides |
//! | [`domain`] | Tags, windows and index values |
//! | [`error`] | Core error types |
//! | [`fetcher`] | Latest value of one instrument |
//! | [`refresh`] | Periodic refresh loop and reporting |
//! | [`seed`] | Dow Jones demo fixture |
//! | [`store`] | Store trait and in-memory store |
//! | [`warehouse_store`] | DuckDB-backed store |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tickdex_core::{Catalog, IndexConfig, RefreshConfig, RefreshLoop, SystemClock, WarehouseStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = WarehouseStore::connect("duckdb://./tickdex.duckdb")?;
//!     let catalog = Catalog::discover(&store).await?;
//!
//!     let mut refresh = RefreshLoop::new(
//!         store,
//!         SystemClock,
//!         &catalog,
//!         &IndexConfig::default(),
//!         RefreshConfig::default(),
//!     )?;
//!
//!     let (_shutdown, signal) = tokio::sync::watch::channel(false);
//!     refresh.run(&mut my_reporter, signal).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Refresh Loop   │──── Clock (sleep between passes)
//! └────────┬────────┘
//!          │ per index
//!          ▼
//! ┌─────────────────┐
//! │ Index Aggregator│
//! └────────┬────────┘
//!          │ per constituent
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Value Fetcher  │────▶│ TimeSeriesStore  │
//! └─────────────────┘     │ (DuckDB / memory)│
//!                         └──────────────────┘
//! ```

pub mod aggregator;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod refresh;
pub mod seed;
pub mod store;
pub mod warehouse_store;

pub use aggregator::{Divisors, IndexAggregator, DOW_DIVISOR};
pub use catalog::Catalog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{parse_divisor_override, IndexConfig};
pub use domain::*;
pub use error::{CoreError, ValidationError};
pub use fetcher::ValueFetcher;
pub use refresh::{
    FailurePolicy, LoopState, PassReport, RefreshConfig, RefreshLoop, Reporter, RunSummary,
};
pub use seed::{seed_dow_jones, SeedOptions, SeedReport};
pub use store::{InMemoryStore, StoreError, TimeSeriesStore, VALUE_COLUMN};
pub use tickdex_warehouse::{
    SeriesPoint, Warehouse, WarehouseConfig, WarehouseError, URL_SCHEME,
};
pub use warehouse_store::WarehouseStore;
