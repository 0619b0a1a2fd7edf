use std::io;
use std::process::ExitCode;

use tickdex_core::{seed_dow_jones, SeedOptions, Warehouse};
use time::Duration;

use crate::cli::{OutputFormat, SeedArgs};
use crate::error::CliError;
use crate::output;

pub async fn run(
    args: &SeedArgs,
    endpoint: &str,
    format: OutputFormat,
) -> Result<ExitCode, CliError> {
    let options = SeedOptions {
        points: args.points,
        step: Duration::seconds(i64::try_from(args.step).unwrap_or(i64::MAX).max(1)),
        seed: args.seed,
        ..SeedOptions::default()
    };

    let target = endpoint.to_string();
    let report = tokio::task::spawn_blocking(move || {
        let warehouse = Warehouse::open_url(&target)?;
        seed_dow_jones(&warehouse, &options)
    })
    .await
    .map_err(io::Error::other)??;

    output::render_seed(format, &mut io::stdout(), &report, endpoint)?;
    Ok(ExitCode::SUCCESS)
}
