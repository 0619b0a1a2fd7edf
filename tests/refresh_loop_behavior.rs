//! Behavior-driven tests for the refresh loop.
//!
//! The loop runs against an in-memory store and a manual clock, so every
//! scenario is deterministic and no test sleeps for real.

use std::io;
use std::sync::Arc;

use tickdex_core::store::StoreFuture;
use tickdex_core::{
    AggregationWindow, Catalog, Clock, CoreError, FailurePolicy, IndexConfig, IndexValue,
    InMemoryStore, LoopState, ManualClock, PassReport, RefreshConfig, RefreshLoop, Reporter,
    StoreError, Tag, TimeSeriesStore,
};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};
use tokio::sync::{watch, Notify};

const NOW: OffsetDateTime = datetime!(2026-03-02 12:00:00 UTC);

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Computed {
        pass: u64,
        index: String,
        value: f64,
        window_end: OffsetDateTime,
    },
    Failed {
        pass: u64,
        index: String,
        code: &'static str,
    },
}

#[derive(Debug, Default)]
struct RecordingReporter {
    events: Vec<Event>,
    passes: Vec<PassReport>,
}

impl RecordingReporter {
    fn computed(&self, index: &str) -> Vec<f64> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Computed {
                    index: name, value, ..
                } if name == index => Some(*value),
                _ => None,
            })
            .collect()
    }

    fn order(&self) -> Vec<(u64, String)> {
        self.events
            .iter()
            .map(|event| match event {
                Event::Computed { pass, index, .. } | Event::Failed { pass, index, .. } => {
                    (*pass, index.clone())
                }
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn index_computed(&mut self, pass: u64, value: &IndexValue) -> io::Result<()> {
        self.events.push(Event::Computed {
            pass,
            index: value.index.clone(),
            value: value.value,
            window_end: value.window.end(),
        });
        Ok(())
    }

    fn index_failed(&mut self, pass: u64, index: &str, error: &CoreError) -> io::Result<()> {
        self.events.push(Event::Failed {
            pass,
            index: index.to_string(),
            code: error.code(),
        });
        Ok(())
    }

    fn pass_finished(&mut self, report: &PassReport) -> io::Result<()> {
        self.passes.push(report.clone());
        Ok(())
    }
}

struct BrokenPipe;

impl Reporter for BrokenPipe {
    fn index_computed(&mut self, _pass: u64, _value: &IndexValue) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
    }

    fn index_failed(&mut self, _pass: u64, _index: &str, _error: &CoreError) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
    }
}

/// Store whose value queries never complete.
struct StallingStore {
    inner: InMemoryStore,
    started: Notify,
}

impl TimeSeriesStore for StallingStore {
    fn list_entries_by_tag<'a>(&'a self, tag: &'a Tag) -> StoreFuture<'a, Vec<String>> {
        self.inner.list_entries_by_tag(tag)
    }

    fn query_last_value<'a>(
        &'a self,
        _entry: &'a str,
        _column: &'a str,
        _window: AggregationWindow,
    ) -> StoreFuture<'a, Option<f64>> {
        Box::pin(async move {
            self.started.notify_one();
            std::future::pending::<Result<Option<f64>, StoreError>>().await
        })
    }
}

/// Two indexes over AAPL (150) and MSFT (250), both fresh.
fn market() -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .tag(Tag::INDEXES, "NDX")
        .tag(Tag::INDEXES, "DJIA")
        .tag(Tag::PRODUCTS, "AAPL")
        .tag(Tag::PRODUCTS, "MSFT")
        .record("AAPL", NOW - Duration::hours(1), 150.0)
        .record("MSFT", NOW - Duration::hours(1), 250.0);
    store
}

fn divisor_two() -> IndexConfig {
    IndexConfig::from_json(r#"{"default_divisor": 2.0}"#).expect("valid config")
}

fn schedule(passes: u64) -> RefreshConfig {
    RefreshConfig {
        interval: Duration::seconds(5),
        max_passes: Some(passes),
        report_each: false,
        ..RefreshConfig::default()
    }
}

// =============================================================================
// Refresh Loop: Scheduling
// =============================================================================

#[tokio::test]
async fn when_loop_runs_each_index_is_reported_once_per_pass_in_sorted_order() {
    // Given: Two indexes, a manual clock and a three-pass budget
    let store = market();
    let clock = Arc::new(ManualClock::new(NOW));
    let catalog = Catalog::discover(&store).await.expect("discover");
    let mut refresh = RefreshLoop::new(
        store,
        Arc::clone(&clock),
        &catalog,
        &divisor_two(),
        schedule(3),
    )
    .expect("loop");
    let mut reporter = RecordingReporter::default();
    let (_shutdown, signal) = watch::channel(false);

    // When: The loop runs to completion
    let summary = refresh.run(&mut reporter, signal).await.expect("run");

    // Then: DJIA precedes NDX in every pass, with the interval slept in between
    let expected: Vec<(u64, String)> = (1..=3)
        .flat_map(|pass| [(pass, String::from("DJIA")), (pass, String::from("NDX"))])
        .collect();
    assert_eq!(reporter.order(), expected);
    assert_eq!(clock.sleeps(), vec![Duration::seconds(5); 2]);
    assert_eq!(clock.now(), NOW + Duration::seconds(10));
    assert_eq!(summary.passes, 3);
    assert_eq!(summary.computed, 6);
    assert!(!summary.cancelled);
    assert_eq!(refresh.state(), &LoopState::Stopped);
    assert_eq!(reporter.passes.len(), 3);
}

#[tokio::test]
async fn when_time_advances_each_pass_uses_a_fresh_window() {
    let store = market();
    let clock = Arc::new(ManualClock::new(NOW));
    let catalog = Catalog::discover(&store).await.expect("discover");
    let mut refresh =
        RefreshLoop::new(store, Arc::clone(&clock), &catalog, &divisor_two(), schedule(2))
            .expect("loop");
    let mut reporter = RecordingReporter::default();
    let (_shutdown, signal) = watch::channel(false);

    refresh.run(&mut reporter, signal).await.expect("run");

    let ends: Vec<OffsetDateTime> = reporter
        .events
        .iter()
        .filter_map(|event| match event {
            Event::Computed {
                index, window_end, ..
            } if index == "DJIA" => Some(*window_end),
            _ => None,
        })
        .collect();
    assert_eq!(ends, [NOW, NOW + Duration::seconds(5)]);
}

#[tokio::test]
async fn when_data_is_unchanged_consecutive_passes_report_identical_values() {
    let store = market();
    let catalog = Catalog::discover(&store).await.expect("discover");
    let mut refresh = RefreshLoop::new(
        store,
        ManualClock::new(NOW),
        &catalog,
        &divisor_two(),
        schedule(2),
    )
    .expect("loop");
    let mut reporter = RecordingReporter::default();
    let (_shutdown, signal) = watch::channel(false);

    refresh.run(&mut reporter, signal).await.expect("run");

    assert_eq!(reporter.computed("DJIA"), [200.0, 200.0]);
    assert_eq!(reporter.computed("NDX"), [200.0, 200.0]);
}

#[tokio::test]
async fn when_run_once_is_used_a_single_pass_is_reported_without_sleeping() {
    let store = market();
    let clock = Arc::new(ManualClock::new(NOW));
    let catalog = Catalog::discover(&store).await.expect("discover");
    let mut refresh = RefreshLoop::new(
        store,
        Arc::clone(&clock),
        &catalog,
        &divisor_two(),
        RefreshConfig::default(),
    )
    .expect("loop");
    let mut reporter = RecordingReporter::default();

    let report = refresh.run_once(&mut reporter).await.expect("pass");

    assert_eq!(report.computed, 2);
    assert!(clock.sleeps().is_empty());
}

// =============================================================================
// Refresh Loop: Failures
// =============================================================================

#[tokio::test]
async fn when_one_index_lacks_data_sibling_indexes_are_still_reported() {
    // Given: TECH depends on stale IBM data, DJIA only on fresh prices
    let store = market();
    store
        .tag(Tag::INDEXES, "TECH")
        .tag(Tag::PRODUCTS, "IBM")
        .record("IBM", NOW - Duration::days(2), 130.0);
    let config = IndexConfig::from_json(
        r#"{
            "default_divisor": 2.0,
            "constituents": {
                "DJIA": ["AAPL", "MSFT"],
                "NDX": ["AAPL", "MSFT"],
                "TECH": ["AAPL", "IBM"]
            }
        }"#,
    )
    .expect("valid config");
    let catalog = Catalog::discover(&store).await.expect("discover");
    let mut refresh = RefreshLoop::new(
        store,
        ManualClock::new(NOW),
        &catalog,
        &config,
        schedule(1),
    )
    .expect("loop");
    let mut reporter = RecordingReporter::default();
    let (_shutdown, signal) = watch::channel(false);

    // When: One pass runs under the default skip policy
    let summary = refresh.run(&mut reporter, signal).await.expect("run");

    // Then: TECH fails with no value while DJIA and NDX are unaffected
    assert_eq!(
        reporter.events[2],
        Event::Failed {
            pass: 1,
            index: String::from("TECH"),
            code: "fetch.no_data_in_window",
        }
    );
    assert_eq!(reporter.computed("DJIA"), [200.0]);
    assert!(reporter.computed("TECH").is_empty());
    assert_eq!(summary.computed, 2);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn when_policy_aborts_the_pass_remaining_indexes_wait_for_the_next_pass() {
    // Given: DJIA (first in order) is missing MSFT data
    let store = InMemoryStore::new();
    store
        .tag(Tag::INDEXES, "DJIA")
        .tag(Tag::INDEXES, "NDX")
        .tag(Tag::PRODUCTS, "AAPL")
        .tag(Tag::PRODUCTS, "MSFT")
        .record("AAPL", NOW - Duration::hours(1), 150.0)
        .create_series("MSFT");
    let config = IndexConfig::from_json(r#"{"constituents": {"NDX": ["AAPL"]}}"#)
        .expect("valid config");
    let catalog = Catalog::discover(&store).await.expect("discover");
    let mut refresh = RefreshLoop::new(
        store,
        ManualClock::new(NOW),
        &catalog,
        &config,
        RefreshConfig {
            policy: FailurePolicy::AbortPass,
            ..schedule(2)
        },
    )
    .expect("loop");
    let mut reporter = RecordingReporter::default();
    let (_shutdown, signal) = watch::channel(false);

    // When: Two passes run
    let summary = refresh.run(&mut reporter, signal).await.expect("run");

    // Then: Each pass stops at DJIA and NDX is never reached
    assert_eq!(
        reporter.order(),
        [(1, String::from("DJIA")), (2, String::from("DJIA"))]
    );
    assert!(reporter.passes.iter().all(|pass| pass.aborted));
    assert_eq!(summary.passes, 2);
}

#[tokio::test]
async fn when_index_has_no_constituents_it_is_reported_as_failed_not_zero() {
    let store = market();
    store.tag(Tag::INDEXES, "EMPTY");
    let config = IndexConfig::from_json(r#"{"constituents": {"EMPTY": []}}"#).expect("config");
    let catalog = Catalog::discover(&store).await.expect("discover");
    let mut refresh = RefreshLoop::new(
        store,
        ManualClock::new(NOW),
        &catalog,
        &config,
        schedule(1),
    )
    .expect("loop");
    let mut reporter = RecordingReporter::default();
    let (_shutdown, signal) = watch::channel(false);

    refresh.run(&mut reporter, signal).await.expect("run");

    assert!(reporter.events.contains(&Event::Failed {
        pass: 1,
        index: String::from("EMPTY"),
        code: "index.no_constituents",
    }));
}

#[tokio::test]
async fn when_reporter_cannot_write_the_loop_stops_with_io_error() {
    let store = market();
    let catalog = Catalog::discover(&store).await.expect("discover");
    let mut refresh = RefreshLoop::new(
        store,
        ManualClock::new(NOW),
        &catalog,
        &divisor_two(),
        schedule(3),
    )
    .expect("loop");
    let (_shutdown, signal) = watch::channel(false);

    let error = refresh
        .run(&mut BrokenPipe, signal)
        .await
        .expect_err("must fail");

    assert_eq!(error.code(), "io");
}

#[tokio::test]
async fn when_divisor_or_interval_is_invalid_the_loop_is_not_built() {
    let store = market();
    let catalog = Catalog::discover(&store).await.expect("discover");
    let negative_divisor =
        IndexConfig::from_json(r#"{"divisors": {"DJIA": -1.0}}"#).expect("valid json");

    let error = RefreshLoop::new(
        market(),
        ManualClock::new(NOW),
        &catalog,
        &negative_divisor,
        schedule(1),
    )
    .err()
    .expect("divisor must be rejected");
    assert!(matches!(error, CoreError::InvalidDivisor { ref index, .. } if index == "DJIA"));

    let error = RefreshLoop::new(
        store,
        ManualClock::new(NOW),
        &catalog,
        &IndexConfig::default(),
        RefreshConfig {
            interval: Duration::ZERO,
            ..RefreshConfig::default()
        },
    )
    .err()
    .expect("interval must be rejected");
    assert_eq!(error.code(), "validation");
}

// =============================================================================
// Refresh Loop: Cancellation
// =============================================================================

#[tokio::test]
async fn when_shutdown_arrives_during_sleep_no_further_pass_runs() {
    // Given: An unbounded loop whose sleeps never finish on their own
    let store = Arc::new(market());
    let clock = Arc::new(ManualClock::holding(NOW));
    let catalog = Catalog::discover(&store).await.expect("discover");
    let mut refresh = RefreshLoop::new(
        Arc::clone(&store),
        Arc::clone(&clock),
        &catalog,
        &divisor_two(),
        RefreshConfig {
            max_passes: None,
            ..schedule(1)
        },
    )
    .expect("loop");
    let (shutdown, signal) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut reporter = RecordingReporter::default();
        let summary = refresh.run(&mut reporter, signal).await;
        (summary, reporter)
    });

    // When: Shutdown is signalled while the loop sleeps after pass 1
    clock.wait_for_sleeps(1).await;
    shutdown.send(true).expect("loop is listening");
    let (summary, reporter) = task.await.expect("task");

    // Then: The loop stops with exactly one pass reported
    let summary = summary.expect("run");
    assert!(summary.cancelled);
    assert_eq!(summary.passes, 1);
    assert_eq!(reporter.events.len(), 2);
    assert_eq!(store.query_count(), 4);
}

#[tokio::test]
async fn when_shutdown_arrives_mid_computation_the_index_is_discarded() {
    // Given: A store whose queries hang
    let store = Arc::new(StallingStore {
        inner: market(),
        started: Notify::new(),
    });
    let catalog = Catalog::discover(&store).await.expect("discover");
    let mut refresh = RefreshLoop::new(
        Arc::clone(&store),
        ManualClock::new(NOW),
        &catalog,
        &divisor_two(),
        schedule(1),
    )
    .expect("loop");
    let (shutdown, signal) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut reporter = RecordingReporter::default();
        let summary = refresh.run(&mut reporter, signal).await;
        (summary, reporter)
    });

    // When: Shutdown is signalled while the first index is being computed
    store.started.notified().await;
    shutdown.send(true).expect("loop is listening");
    let (summary, reporter) = task.await.expect("task");

    // Then: Nothing is reported for the interrupted index
    let summary = summary.expect("run");
    assert!(summary.cancelled);
    assert_eq!(summary.computed, 0);
    assert!(reporter.events.is_empty());
    assert!(reporter.passes.is_empty());
}

#[tokio::test]
async fn when_shutdown_is_already_set_no_pass_starts() {
    let store = market();
    let catalog = Catalog::discover(&store).await.expect("discover");
    let mut refresh = RefreshLoop::new(
        store,
        ManualClock::new(NOW),
        &catalog,
        &divisor_two(),
        schedule(5),
    )
    .expect("loop");
    let mut reporter = RecordingReporter::default();
    let (_shutdown, signal) = watch::channel(true);

    let summary = refresh.run(&mut reporter, signal).await.expect("run");

    assert!(summary.cancelled);
    assert_eq!(summary.passes, 0);
    assert!(reporter.events.is_empty());
}
