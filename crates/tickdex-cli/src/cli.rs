//! CLI argument definitions for tickdex.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Recompute every index periodically |
//! | `catalog` | Print every tag group of the store |
//! | `seed` | Write the Dow Jones demo data set |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--store` | `duckdb://$TICKDEX_HOME/cache/warehouse.duckdb` | Store endpoint |
//! | `--format` | `text` | Output format (text, ndjson) |
//!
//! # Examples
//!
//! ```bash
//! # Seed a fresh store and watch the DJIA every 5 seconds
//! tickdex --store duckdb://./djia.duckdb seed
//! tickdex --store duckdb://./djia.duckdb run --interval 5
//!
//! # Three passes of machine-readable output with a custom divisor
//! tickdex run --format ndjson --passes 3 --divisor DJIA=0.15
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tickdex_core::FailurePolicy;

/// Real-time composite index calculator.
#[derive(Debug, Parser)]
#[command(
    name = "tickdex",
    author,
    version,
    about = "Compute price-weighted composite indexes from a tagged time-series store"
)]
pub struct Cli {
    /// Store endpoint, `duckdb://<path>` or a bare file path.
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Output format for reports.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable console lines.
    Text,
    /// One JSON object per event.
    Ndjson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnError {
    /// Report the failed index and continue the pass.
    Skip,
    /// Report the failed index and end the pass.
    Abort,
}

impl From<OnError> for FailurePolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Skip => Self::SkipIndex,
            OnError::Abort => Self::AbortPass,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Recompute every index tagged @indexes, pass after pass.
    ///
    /// # Examples
    ///
    ///   tickdex run
    ///   tickdex run --interval 10 --hide-products
    ///   tickdex run --config indexes.json --on-error abort
    Run(RunArgs),

    /// Print the catalog: every tag listed under @tags with its entries.
    Catalog,

    /// Create the DJIA index and its 30 products with random-walk prices.
    Seed(SeedArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Number of seconds between each refresh.
    #[arg(long, default_value_t = 1, value_name = "SECONDS")]
    pub interval: u64,

    /// Hide the value of each product.
    #[arg(long, default_value_t = false)]
    pub hide_products: bool,

    /// Divisor of one index, repeatable.
    #[arg(long = "divisor", value_name = "NAME=VALUE")]
    pub divisors: Vec<String>,

    /// JSON file with default divisor, per-index divisors and constituents.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// What to do with the rest of a pass when an index fails.
    #[arg(long, value_enum, default_value_t = OnError::Skip)]
    pub on_error: OnError,

    /// Stop after this many passes instead of running until interrupted.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub passes: Option<u64>,
}

#[derive(Debug, Args)]
pub struct SeedArgs {
    /// Points written per product.
    #[arg(long, default_value_t = 60)]
    pub points: usize,

    /// Seconds between consecutive points.
    #[arg(long, default_value_t = 60, value_name = "SECONDS")]
    pub step: u64,

    /// Fixed random seed for reproducible data.
    #[arg(long)]
    pub seed: Option<u64>,
}
