use std::io;
use std::process::ExitCode;

use tickdex_core::{Catalog, IndexConfig, RefreshConfig, RefreshLoop, SystemClock, WarehouseStore};
use tokio::sync::watch;

use crate::cli::{OutputFormat, RunArgs};
use crate::error::CliError;
use crate::output;

/// Exit code of a run that reported at least one failed index.
const EXIT_INDEX_FAILURES: u8 = 5;

pub async fn run(
    args: &RunArgs,
    endpoint: &str,
    format: OutputFormat,
    shutdown: watch::Receiver<bool>,
) -> Result<ExitCode, CliError> {
    let indexes = index_config(args)?;
    let schedule = RefreshConfig {
        policy: args.on_error.into(),
        report_each: !args.hide_products,
        max_passes: args.passes,
        ..RefreshConfig::default()
    }
    .with_interval_secs(args.interval)?;

    let store = WarehouseStore::connect(endpoint)?;
    let catalog = Catalog::discover(&store).await?;
    if format == OutputFormat::Text {
        output::render_catalog(format, &mut io::stdout(), &catalog)?;
    }

    let mut refresh = RefreshLoop::new(store, SystemClock, &catalog, &indexes, schedule)?;
    let mut reporter = output::reporter(format, io::stdout());
    let summary = refresh.run(reporter.as_mut(), shutdown).await?;

    if summary.failed > 0 {
        return Ok(ExitCode::from(EXIT_INDEX_FAILURES));
    }
    Ok(ExitCode::SUCCESS)
}

/// JSON configuration file, if any, refined by `--divisor` overrides.
fn index_config(args: &RunArgs) -> Result<IndexConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => IndexConfig::load(path)?,
        None => IndexConfig::default(),
    };
    for raw in &args.divisors {
        config.apply_divisor_override(raw)?;
    }
    config.divisors()?;
    Ok(config)
}
