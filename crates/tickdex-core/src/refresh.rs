//! Periodic recomputation of every index.
//!
//! # State Machine
//!
//! ```text
//! Idle -> Computing(index_1) -> ... -> Computing(index_k) -> Sleeping -> Computing(index_1) ...
//!                                                                  \-> Stopped
//! ```
//!
//! Each pass walks `@indexes` in sorted order and reports every index before
//! moving to the next one. Reports are never retracted. A shutdown signal
//! interrupts both store queries and the inter-pass sleep; the index being
//! computed at that moment is dropped without a report.

use std::fmt::{Display, Formatter};
use std::io;

use serde::{Deserialize, Serialize};
use time::Duration;
use tokio::sync::watch;

use crate::clock::Clock;
use crate::store::TimeSeriesStore;
use crate::{
    AggregationWindow, Catalog, CoreError, IndexAggregator, IndexConfig, IndexValue, Tag,
    ValidationError, DEFAULT_WINDOW_SPAN,
};

/// What to do with the rest of a pass after an index fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failure and continue with the next index.
    #[default]
    SkipIndex,
    /// Report the failure and end the pass.
    AbortPass,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Computing { pass: u64, index: String },
    Sleeping { pass: u64 },
    Stopped,
}

impl Display for LoopState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Computing { pass, index } => write!(f, "computing {index} (pass {pass})"),
            Self::Sleeping { pass } => write!(f, "sleeping after pass {pass}"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

/// Scheduling options of the refresh loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshConfig {
    pub interval: Duration,
    pub policy: FailurePolicy,
    /// Include every constituent value in each report.
    pub report_each: bool,
    /// Stop after this many passes; run until shutdown when `None`.
    pub max_passes: Option<u64>,
    pub window_span: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::SECOND,
            policy: FailurePolicy::SkipIndex,
            report_each: true,
            max_passes: None,
            window_span: DEFAULT_WINDOW_SPAN,
        }
    }
}

impl RefreshConfig {
    pub fn with_interval_secs(mut self, seconds: u64) -> Result<Self, ValidationError> {
        let interval =
            i64::try_from(seconds).map_err(|_| ValidationError::IntervalTooLarge { seconds })?;
        self.interval = Duration::seconds(interval);
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval < Duration::SECOND {
            return Err(ValidationError::NonPositiveInterval);
        }
        if !self.window_span.is_positive() {
            return Err(ValidationError::EmptyWindow);
        }
        Ok(())
    }
}

/// One index and the constituents it is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexPlan {
    index: String,
    constituents: Vec<String>,
}

/// Sink for refresh results.
///
/// Write failures abort the loop with [`CoreError::Io`].
pub trait Reporter: Send {
    fn index_computed(&mut self, pass: u64, value: &IndexValue) -> io::Result<()>;

    fn index_failed(&mut self, pass: u64, index: &str, error: &CoreError) -> io::Result<()>;

    fn pass_finished(&mut self, _report: &PassReport) -> io::Result<()> {
        Ok(())
    }
}

/// Outcome counts of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub pass: u64,
    pub computed: usize,
    pub failed: usize,
    /// The pass ended early under [`FailurePolicy::AbortPass`].
    pub aborted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub passes: u64,
    pub computed: usize,
    pub failed: usize,
    pub cancelled: bool,
}

enum PassOutcome {
    Finished(PassReport),
    Cancelled(PassReport),
}

/// Drives index computation pass after pass.
pub struct RefreshLoop<S, C> {
    store: S,
    clock: C,
    aggregator: IndexAggregator,
    plans: Vec<IndexPlan>,
    config: RefreshConfig,
    state: LoopState,
}

impl<S, C> RefreshLoop<S, C>
where
    S: TimeSeriesStore,
    C: Clock,
{
    /// Build a loop over every index of `catalog`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid divisor or interval. Problems with a single index,
    /// such as an empty constituent list, surface during passes instead.
    pub fn new(
        store: S,
        clock: C,
        catalog: &Catalog,
        indexes: &IndexConfig,
        config: RefreshConfig,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let divisors = indexes.divisors()?;
        for unknown in indexes.unknown_indexes(catalog) {
            log::warn!(
                "configuration mentions '{unknown}' which is not tagged {}",
                Tag::INDEXES
            );
        }

        let plans = catalog
            .indexes()
            .iter()
            .map(|index| IndexPlan {
                index: index.clone(),
                constituents: indexes.constituents_for(index, catalog),
            })
            .collect();

        Ok(Self {
            store,
            clock,
            aggregator: IndexAggregator::new(divisors, catalog),
            plans,
            config,
            state: LoopState::Idle,
        })
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Run passes until `max_passes` is reached or `shutdown` becomes `true`.
    ///
    /// No sleep follows the final pass.
    pub async fn run<R>(
        &mut self,
        reporter: &mut R,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<RunSummary, CoreError>
    where
        R: Reporter + ?Sized,
    {
        let mut summary = RunSummary::default();
        log::info!(
            "refresh loop started: {} indexes, interval {}s",
            self.plans.len(),
            self.config.interval.whole_seconds()
        );

        loop {
            if *shutdown.borrow_and_update() {
                summary.cancelled = true;
                break;
            }

            let pass = summary.passes + 1;
            match self.run_pass(pass, reporter, &mut shutdown).await? {
                PassOutcome::Finished(report) => {
                    summary.record(&report);
                    reporter.pass_finished(&report)?;
                }
                PassOutcome::Cancelled(report) => {
                    summary.record(&report);
                    summary.cancelled = true;
                    break;
                }
            }

            if self
                .config
                .max_passes
                .is_some_and(|max_passes| summary.passes >= max_passes)
            {
                break;
            }

            self.transition(LoopState::Sleeping { pass });
            tokio::select! {
                biased;
                () = cancelled(&mut shutdown) => {
                    summary.cancelled = true;
                    break;
                }
                () = self.clock.sleep(self.config.interval) => {}
            }
        }

        self.transition(LoopState::Stopped);
        log::info!(
            "refresh loop stopped after {} passes ({} computed, {} failed{})",
            summary.passes,
            summary.computed,
            summary.failed,
            if summary.cancelled { ", cancelled" } else { "" }
        );
        Ok(summary)
    }

    /// Compute and report every index once.
    pub async fn run_once<R>(&mut self, reporter: &mut R) -> Result<PassReport, CoreError>
    where
        R: Reporter + ?Sized,
    {
        let (_sender, mut shutdown) = watch::channel(false);
        let report = match self.run_pass(1, reporter, &mut shutdown).await? {
            PassOutcome::Finished(report) | PassOutcome::Cancelled(report) => report,
        };
        reporter.pass_finished(&report)?;
        self.transition(LoopState::Idle);
        Ok(report)
    }

    async fn run_pass<R>(
        &mut self,
        pass: u64,
        reporter: &mut R,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<PassOutcome, CoreError>
    where
        R: Reporter + ?Sized,
    {
        let mut report = PassReport {
            pass,
            ..PassReport::default()
        };

        for position in 0..self.plans.len() {
            if *shutdown.borrow_and_update() {
                return Ok(PassOutcome::Cancelled(report));
            }

            let index = self.plans[position].index.clone();
            self.transition(LoopState::Computing {
                pass,
                index: index.clone(),
            });

            let plan = &self.plans[position];
            let window = AggregationWindow::trailing(self.clock.now(), self.config.window_span);
            let result = tokio::select! {
                biased;
                () = cancelled(shutdown) => {
                    log::debug!("pass {pass} cancelled while computing {index}");
                    return Ok(PassOutcome::Cancelled(report));
                }
                result = self.aggregator.compute(
                    &self.store,
                    &plan.index,
                    &plan.constituents,
                    window,
                    self.config.report_each,
                ) => result,
            };

            match result {
                Ok(value) => {
                    reporter.index_computed(pass, &value)?;
                    report.computed += 1;
                }
                Err(error) => {
                    if error.transient() {
                        log::warn!("index {index} failed in pass {pass}, will retry: {error}");
                    } else {
                        log::error!("index {index} failed in pass {pass}: {error}");
                    }
                    reporter.index_failed(pass, &index, &error)?;
                    report.failed += 1;
                    if self.config.policy == FailurePolicy::AbortPass {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        Ok(PassOutcome::Finished(report))
    }

    fn transition(&mut self, next: LoopState) {
        log::debug!("refresh loop: {} -> {next}", self.state);
        self.state = next;
    }
}

impl RunSummary {
    fn record(&mut self, report: &PassReport) {
        self.passes += 1;
        self.computed += report.computed;
        self.failed += report.failed;
    }
}

/// Resolves once the shutdown flag is set. Never resolves if the sender is gone.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
