//! Periodic, single-flight driver for a [`Collector`]
//!
//! Every tick either starts a cycle or, if the previous one is still
//! outstanding, is skipped. Outcomes go through a channel to a separate
//! delivery task, so a slow consumer never holds up the ticker.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::collector::{CollectionOutcome, Collector};
use super::settings::DEFAULT_INTERVAL_SECS;
use crate::tracing::span_names;

/// Counters describing a scheduler's activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Ticks observed
    pub ticks: u64,
    /// Ticks that started a cycle
    pub cycles_started: u64,
    /// Ticks dropped because a cycle was outstanding
    pub ticks_skipped: u64,
    /// Outcomes the consumer accepted without panicking
    pub outcomes_delivered: u64,
    /// Outcomes whose consumer call panicked
    pub consumer_panics: u64,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    cycles_started: AtomicU64,
    ticks_skipped: AtomicU64,
    outcomes_delivered: AtomicU64,
    consumer_panics: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            cycles_started: self.cycles_started.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            outcomes_delivered: self.outcomes_delivered.load(Ordering::Relaxed),
            consumer_panics: self.consumer_panics.load(Ordering::Relaxed),
        }
    }
}

/// Clears the busy flag when the cycle task finishes or is aborted
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs a collector on a fixed interval
pub struct Scheduler {
    collector: Arc<dyn Collector>,
    interval: Duration,
}

impl Scheduler {
    /// Creates a scheduler; a zero interval is raised to one millisecond
    #[must_use]
    pub fn new(collector: Arc<dyn Collector>, interval: Duration) -> Self {
        Self {
            collector,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Creates a scheduler with the default five second interval
    #[must_use]
    pub fn with_default_interval(collector: Arc<dyn Collector>) -> Self {
        Self::new(
            collector,
            Duration::from_secs(u64::from(DEFAULT_INTERVAL_SECS)),
        )
    }

    /// The tick period
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts ticking; the first cycle begins immediately.
    ///
    /// `consumer` is called once per completed cycle, in completion order,
    /// on a dedicated task. Must be called within a tokio runtime.
    pub fn start<F>(self, consumer: F) -> SchedulerHandle
    where
        F: Fn(CollectionOutcome) + Send + Sync + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
        let counters = Arc::new(Counters::default());

        tracing::info!(interval_ms = self.interval.as_millis(), "Scheduler started");
        let task = tokio::spawn(run_loop(
            self.collector,
            self.interval,
            consumer,
            stop_rx,
            Arc::clone(&counters),
        ));

        SchedulerHandle {
            stop_tx,
            counters,
            task,
        }
    }
}

async fn run_loop<F>(
    collector: Arc<dyn Collector>,
    period: Duration,
    consumer: F,
    mut stop_rx: mpsc::Receiver<()>,
    counters: Arc<Counters>,
) where
    F: Fn(CollectionOutcome) + Send + Sync + 'static,
{
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<CollectionOutcome>();

    let delivery = {
        let counters = Arc::clone(&counters);
        tokio::spawn(async move {
            while let Some(outcome) = outcome_rx.recv().await {
                // A panicking consumer loses that outcome only
                match panic::catch_unwind(AssertUnwindSafe(|| consumer(outcome))) {
                    Ok(()) => {
                        counters.outcomes_delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(_) => {
                        counters.consumer_panics.fetch_add(1, Ordering::Relaxed);
                        tracing::error!("Outcome consumer panicked");
                    }
                }
            }
        })
    };

    let busy = Arc::new(AtomicBool::new(false));
    let mut in_flight: Option<JoinHandle<()>> = None;
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            // A dropped handle also stops the loop
            _ = stop_rx.recv() => break,
            _ = ticker.tick() => {
                let tick = counters.ticks.fetch_add(1, Ordering::Relaxed) + 1;
                let _span = tracing::debug_span!(span_names::SCHEDULER_TICK, tick).entered();

                if busy
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    counters.ticks_skipped.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Previous cycle still running, skipping tick");
                    continue;
                }

                counters.cycles_started.fetch_add(1, Ordering::Relaxed);
                let guard = BusyGuard(Arc::clone(&busy));
                let collector = Arc::clone(&collector);
                let outcome_tx = outcome_tx.clone();
                in_flight = Some(tokio::spawn(async move {
                    let _guard = guard;
                    let outcome = collector.collect().await;
                    let _ = outcome_tx.send(outcome);
                }));
            }
        }
    }

    if let Some(cycle) = in_flight.take()
        && !cycle.is_finished()
    {
        cycle.abort();
        let _ = cycle.await;
        tracing::debug!("In-flight cycle cancelled");
    }

    // Outcomes already queued are still delivered
    drop(outcome_tx);
    let _ = delivery.await;
    tracing::info!("Scheduler stopped");
}

/// Handle to a running [`Scheduler`]
///
/// Dropping the handle stops the scheduler as well, without waiting.
#[derive(Debug)]
pub struct SchedulerHandle {
    stop_tx: mpsc::Sender<()>,
    counters: Arc<Counters>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops ticking, cancels any in-flight cycle and waits for pending
    /// outcomes to be delivered. Returns the final counters.
    pub async fn stop(self) -> SchedulerStats {
        let _ = self.stop_tx.send(()).await;
        let _ = self.task.await;
        self.counters.snapshot()
    }

    /// Current activity counters
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.counters.snapshot()
    }

    /// Returns true once the scheduler loop has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
