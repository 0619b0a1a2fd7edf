//! Time source and sleeping for the refresh loop.
//!
//! [`SystemClock`] reads the wall clock and sleeps on the tokio timer.
//! [`ManualClock`] never sleeps for real: each sleep advances its time by the
//! requested duration and is recorded, so tests can assert on scheduling.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use time::{Duration, OffsetDateTime};
use tokio::sync::watch;

pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Injectable time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;

    /// Suspend for `duration`. Non-positive durations complete immediately.
    fn sleep<'a>(&'a self, duration: Duration) -> SleepFuture<'a>;
}

impl<C> Clock for Arc<C>
where
    C: Clock + ?Sized,
{
    fn now(&self) -> OffsetDateTime {
        self.as_ref().now()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> SleepFuture<'a> {
        self.as_ref().sleep(duration)
    }
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> SleepFuture<'a> {
        Box::pin(async move {
            if duration.is_positive() {
                tokio::time::sleep(duration.unsigned_abs()).await;
            }
        })
    }
}

/// Deterministic clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
    sleeps: Mutex<Vec<Duration>>,
    started: watch::Sender<usize>,
    hold: bool,
}

impl ManualClock {
    /// Clock starting at `start` whose sleeps complete immediately.
    pub fn new(start: OffsetDateTime) -> Self {
        Self::build(start, false)
    }

    /// Clock whose sleeps never complete, for cancellation tests.
    pub fn holding(start: OffsetDateTime) -> Self {
        Self::build(start, true)
    }

    fn build(start: OffsetDateTime, hold: bool) -> Self {
        let (started, _) = watch::channel(0);
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
            started,
            hold,
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += duration;
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wait until at least `count` sleeps have started.
    pub async fn wait_for_sleeps(&self, count: usize) {
        let mut started = self.started.subscribe();
        let _ = started.wait_for(|started| *started >= count).await;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sleep<'a>(&'a self, duration: Duration) -> SleepFuture<'a> {
        Box::pin(async move {
            self.sleeps
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(duration);
            self.started.send_modify(|started| *started += 1);

            if self.hold {
                std::future::pending::<()>().await;
            }
            self.advance(duration);
            tokio::task::yield_now().await;
        })
    }
}
