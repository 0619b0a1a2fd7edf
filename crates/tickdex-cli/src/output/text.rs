use std::io::{self, Write};

use tickdex_core::{Catalog, CoreError, IndexValue, Reporter, SeedReport};

/// Console reporter mirroring the classic index printout.
pub struct TextReporter<W> {
    out: W,
}

impl<W: Write + Send> TextReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Reporter for TextReporter<W> {
    fn index_computed(&mut self, _pass: u64, value: &IndexValue) -> io::Result<()> {
        if !value.constituents.is_empty() {
            writeln!(self.out)?;
            writeln!(self.out, "Products of {}:", value.index)?;
            for constituent in &value.constituents {
                writeln!(
                    self.out,
                    "{:5}: value {}",
                    constituent.instrument, constituent.value
                )?;
            }
            writeln!(self.out)?;
        }
        writeln!(self.out, "Index of {} = {}", value.index, value.value)?;
        self.out.flush()
    }

    fn index_failed(&mut self, _pass: u64, index: &str, error: &CoreError) -> io::Result<()> {
        writeln!(self.out, "Index of {index} failed [{}]: {error}", error.code())?;
        self.out.flush()
    }
}

pub fn write_catalog<W: Write>(out: &mut W, catalog: &Catalog) -> io::Result<()> {
    for (tag, entries) in catalog.groups() {
        writeln!(out)?;
        writeln!(out, "{}:", tag.label())?;
        for (position, entry) in entries.iter().enumerate() {
            writeln!(out, "{position:4}. {entry}")?;
        }
    }
    out.flush()
}

pub fn write_seed<W: Write>(out: &mut W, report: &SeedReport, store: &str) -> io::Result<()> {
    writeln!(
        out,
        "Seeded {}: {} products, {} points into {store}",
        report.index, report.products, report.points
    )
}
