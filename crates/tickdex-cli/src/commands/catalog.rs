use std::io;
use std::process::ExitCode;

use tickdex_core::{Catalog, WarehouseStore};

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::output;

pub async fn run(endpoint: &str, format: OutputFormat) -> Result<ExitCode, CliError> {
    let store = WarehouseStore::connect(endpoint)?;
    let catalog = Catalog::discover(&store).await?;

    output::render_catalog(format, &mut io::stdout(), &catalog)?;
    Ok(ExitCode::SUCCESS)
}
