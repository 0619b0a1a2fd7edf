mod catalog;
mod run;
mod seed;

use std::process::ExitCode;

use tickdex_core::{WarehouseConfig, URL_SCHEME};
use tokio::sync::watch;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli, shutdown: watch::Receiver<bool>) -> Result<ExitCode, CliError> {
    let endpoint = store_endpoint(cli);
    log::debug!("using store {endpoint}");

    match &cli.command {
        Command::Run(args) => run::run(args, &endpoint, cli.format, shutdown).await,
        Command::Catalog => catalog::run(&endpoint, cli.format).await,
        Command::Seed(args) => seed::run(args, &endpoint, cli.format).await,
    }
}

/// Explicit `--store`, or the warehouse under `$TICKDEX_HOME`.
fn store_endpoint(cli: &Cli) -> String {
    match &cli.store {
        Some(store) => store.clone(),
        None => format!(
            "{URL_SCHEME}{}",
            WarehouseConfig::default().db_path.display()
        ),
    }
}
