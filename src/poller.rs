//! Recurring fetches against the metrics API.
//!
//! Each schedule is one task that issues its request inline, so two requests
//! for the same schedule never overlap: a tick that fires while a request is
//! still in flight is skipped. Every request additionally carries a
//! process-wide sequence number and the state holder drops completions older
//! than the newest one it applied for that target.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::{ChartRange, MetricsSource};
use crate::state::{ApplyOutcome, DashboardState, SubscriptionId};

pub use crate::state::PollTarget;

/// Shortest accepted polling period; shorter intervals are raised to it.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_seq() -> u64 {
    REQUEST_SEQ.fetch_add(1, Ordering::Relaxed) + 1
}

#[derive(Clone)]
pub struct Poller {
    source: Arc<dyn MetricsSource>,
    state: DashboardState,
    charts_window_secs: Option<u64>,
}

impl Poller {
    pub fn new(source: Arc<dyn MetricsSource>, state: DashboardState) -> Self {
        Self {
            source,
            state,
            charts_window_secs: None,
        }
    }

    /// Charts requests ask for the trailing `window_secs` instead of the
    /// server default range.
    pub fn with_charts_window(mut self, window_secs: Option<u64>) -> Self {
        self.charts_window_secs = window_secs;
        self
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Starts polling `target` every `interval`, first request immediately.
    /// The schedule runs until the returned handle is cancelled or dropped.
    /// An interval below [`MIN_INTERVAL`] is raised to it.
    pub fn start(&self, target: PollTarget, interval: Duration) -> PollHandle {
        let interval = if interval < MIN_INTERVAL {
            warn!(
                %target,
                requested_ms = interval.as_millis() as u64,
                min_ms = MIN_INTERVAL.as_millis() as u64,
                "Polling interval too short; using the minimum."
            );
            MIN_INTERVAL
        } else {
            interval
        };
        let subscription = self.state.register(target.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_schedule(
            self.clone(),
            target.clone(),
            subscription,
            interval,
            shutdown_rx,
        ));
        PollHandle {
            target,
            subscription,
            state: self.state.clone(),
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    async fn poll_once(&self, target: &PollTarget, subscription: SubscriptionId) -> ApplyOutcome {
        let seq = next_seq();
        match target {
            PollTarget::Overview => {
                let result = self.source.overview().await;
                self.state.apply_overview(subscription, seq, result)
            }
            PollTarget::Charts(node_id) => {
                let range = self.charts_window_secs.map(ChartRange::trailing_from_now);
                let result = self.source.charts(node_id, range).await;
                self.state.apply_charts(subscription, seq, result)
            }
        }
    }
}

async fn run_schedule(
    poller: Poller,
    target: PollTarget,
    subscription: SubscriptionId,
    interval: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    info!(%target, interval_ms = interval.as_millis() as u64, "Polling started.");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown_rx => break,

            _ = ticker.tick() => {
                tokio::select! {
                    biased;

                    _ = &mut shutdown_rx => break,

                    outcome = poller.poll_once(&target, subscription) => {
                        debug!(%target, ?outcome, "Poll completed.");
                        if outcome == ApplyOutcome::Cancelled {
                            break;
                        }
                    }
                }
            }
        }
    }
    info!(%target, "Polling stopped.");
}

/// Owner of one running schedule. Cancels the schedule when dropped.
#[derive(Debug)]
pub struct PollHandle {
    target: PollTarget,
    subscription: SubscriptionId,
    state: DashboardState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn target(&self) -> &PollTarget {
        &self.target
    }

    pub fn is_active(&self) -> bool {
        self.shutdown_tx.is_some()
    }

    /// Stops the timer. A request already in flight may still finish, but its
    /// result is never published. Calling it twice is harmless.
    pub fn cancel(&mut self) {
        self.state.unregister(self.subscription);
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            if shutdown_tx.send(()).is_err() {
                debug!(target = %self.target, "Polling task already finished.");
            }
        }
    }

    /// Cancels and waits for the polling task to exit.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(target = %self.target, error = %e, "Polling task ended abnormally.");
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
