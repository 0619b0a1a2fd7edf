use std::io::{self, Write};

use serde::Serialize;
use tickdex_core::{
    AggregationWindow, Catalog, ConstituentValue, CoreError, IndexValue, PassReport, Reporter,
    SeedReport,
};
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event<'a> {
    Index {
        run_id: Uuid,
        pass: u64,
        index: &'a str,
        value: f64,
        sum: f64,
        divisor: f64,
        window: &'a AggregationWindow,
        #[serde(skip_serializing_if = "no_constituents")]
        constituents: &'a [ConstituentValue],
    },
    IndexError {
        run_id: Uuid,
        pass: u64,
        index: &'a str,
        code: &'static str,
        message: String,
    },
    Pass {
        run_id: Uuid,
        pass: u64,
        computed: usize,
        failed: usize,
        aborted: bool,
    },
    Tag {
        tag: &'a str,
        entries: &'a [String],
    },
    Seed {
        store: &'a str,
        index: &'a str,
        products: usize,
        points: usize,
    },
}

/// Reporter emitting one JSON object per line, tagged with a run id.
pub struct NdjsonReporter<W> {
    out: W,
    run_id: Uuid,
}

impl<W: Write + Send> NdjsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self::with_run_id(out, Uuid::new_v4())
    }

    pub fn with_run_id(out: W, run_id: Uuid) -> Self {
        Self { out, run_id }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Reporter for NdjsonReporter<W> {
    fn index_computed(&mut self, pass: u64, value: &IndexValue) -> io::Result<()> {
        write_event(
            &mut self.out,
            &Event::Index {
                run_id: self.run_id,
                pass,
                index: &value.index,
                value: value.value,
                sum: value.sum,
                divisor: value.divisor,
                window: &value.window,
                constituents: &value.constituents,
            },
        )
    }

    fn index_failed(&mut self, pass: u64, index: &str, error: &CoreError) -> io::Result<()> {
        write_event(
            &mut self.out,
            &Event::IndexError {
                run_id: self.run_id,
                pass,
                index,
                code: error.code(),
                message: error.to_string(),
            },
        )
    }

    fn pass_finished(&mut self, report: &PassReport) -> io::Result<()> {
        write_event(
            &mut self.out,
            &Event::Pass {
                run_id: self.run_id,
                pass: report.pass,
                computed: report.computed,
                failed: report.failed,
                aborted: report.aborted,
            },
        )
    }
}

pub fn write_catalog<W: Write>(out: &mut W, catalog: &Catalog) -> io::Result<()> {
    for (tag, entries) in catalog.groups() {
        write_event(
            out,
            &Event::Tag {
                tag: tag.as_str(),
                entries,
            },
        )?;
    }
    Ok(())
}

pub fn write_seed<W: Write>(out: &mut W, report: &SeedReport, store: &str) -> io::Result<()> {
    write_event(
        out,
        &Event::Seed {
            store,
            index: &report.index,
            products: report.products,
            points: report.points,
        },
    )
}

fn no_constituents(constituents: &&[ConstituentValue]) -> bool {
    constituents.is_empty()
}

fn write_event<W: Write + ?Sized>(out: &mut W, event: &Event<'_>) -> io::Result<()> {
    serde_json::to_writer(&mut *out, event)?;
    writeln!(out)?;
    out.flush()
}
