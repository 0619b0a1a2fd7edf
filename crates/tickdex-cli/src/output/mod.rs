//! Report rendering for each output format.

mod ndjson;
mod text;

use std::io::{self, Write};

use tickdex_core::{Catalog, Reporter, SeedReport};

use self::ndjson::NdjsonReporter;
use self::text::TextReporter;
use crate::cli::OutputFormat;

/// Reporter for `format` writing to `out`.
pub fn reporter<'a, W>(format: OutputFormat, out: W) -> Box<dyn Reporter + 'a>
where
    W: Write + Send + 'a,
{
    match format {
        OutputFormat::Text => Box::new(TextReporter::new(out)),
        OutputFormat::Ndjson => Box::new(NdjsonReporter::new(out)),
    }
}

pub fn render_catalog<W: Write>(
    format: OutputFormat,
    out: &mut W,
    catalog: &Catalog,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => text::write_catalog(out, catalog),
        OutputFormat::Ndjson => ndjson::write_catalog(out, catalog),
    }
}

pub fn render_seed<W: Write>(
    format: OutputFormat,
    out: &mut W,
    report: &SeedReport,
    store: &str,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => text::write_seed(out, report, store),
        OutputFormat::Ndjson => ndjson::write_seed(out, report, store),
    }
}
