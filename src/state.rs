//! Shared dashboard state: the single writer of everything the views render.
use nodenexus_common::model::{NodesIndex, OverviewSet, RawSeriesPayload, TimeSeriesWindow};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::reconciler::reconcile;

pub const OVERVIEW_ERROR: &str = "Failed to load overview data";
pub const CHARTS_ERROR: &str = "Failed to load chart data";
pub const NODES_ERROR: &str = "Failed to load navigation data";

/// What a polling schedule fetches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PollTarget {
    Overview,
    Charts(String),
}

impl fmt::Display for PollTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollTarget::Overview => write!(f, "overview"),
            PollTarget::Charts(node_id) => write!(f, "charts:{node_id}"),
        }
    }
}

/// Identifies one registered polling schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// What happened to one completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// New data was published and the error flag cleared.
    Applied,
    /// The request failed; the previous data stays and the error flag is set.
    Failed,
    /// A newer request for the same target already completed.
    Stale,
    /// The schedule was cancelled before the response arrived.
    Cancelled,
}

#[derive(Debug, Default)]
struct ChartsEntry {
    window: Option<Arc<TimeSeriesWindow>>,
    error: Option<&'static str>,
}

#[derive(Debug, Default)]
struct Inner {
    nodes: Option<Arc<NodesIndex>>,
    nodes_error: Option<&'static str>,
    overview: Option<Arc<OverviewSet>>,
    overview_error: Option<&'static str>,
    charts: HashMap<String, ChartsEntry>,
    last_applied: HashMap<PollTarget, u64>,
    subscriptions: HashMap<SubscriptionId, PollTarget>,
    next_subscription: u64,
    version: u64,
}

impl Inner {
    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    /// Checks that a completion may be published and records its stamp.
    fn admit(&mut self, sub: SubscriptionId, seq: u64) -> Result<PollTarget, ApplyOutcome> {
        let target = self
            .subscriptions
            .get(&sub)
            .cloned()
            .ok_or(ApplyOutcome::Cancelled)?;
        let last = self.last_applied.entry(target.clone()).or_insert(0);
        if seq <= *last {
            return Err(ApplyOutcome::Stale);
        }
        *last = seq;
        Ok(target)
    }
}

struct Shared {
    inner: Mutex<Inner>,
    changes: watch::Sender<u64>,
}

/// Cloneable handle to the dashboard state.
///
/// Data is published as whole `Arc` snapshots, so a reader never observes a
/// half-updated collection. Every change bumps a version number broadcast on
/// a watch channel.
#[derive(Clone)]
pub struct DashboardState {
    shared: Arc<Shared>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DashboardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardState")
            .field("version", &self.version())
            .finish()
    }
}

impl DashboardState {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                changes,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, version: u64) {
        self.shared.changes.send_replace(version);
    }

    /// Receiver that observes the version number after every change.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.shared.changes.subscribe()
    }

    pub fn version(&self) -> u64 {
        self.lock().version
    }

    pub fn register(&self, target: PollTarget) -> SubscriptionId {
        let mut inner = self.lock();
        inner.next_subscription += 1;
        let id = SubscriptionId(inner.next_subscription);
        debug!(%target, subscription = id.0, "Registered polling subscription.");
        inner.subscriptions.insert(id, target);
        id
    }

    /// After this returns, no completion for `sub` can be published.
    pub fn unregister(&self, sub: SubscriptionId) {
        if let Some(target) = self.lock().subscriptions.remove(&sub) {
            debug!(%target, subscription = sub.0, "Unregistered polling subscription.");
        }
    }

    pub fn is_registered(&self, sub: SubscriptionId) -> bool {
        self.lock().subscriptions.contains_key(&sub)
    }

    pub fn apply_overview(
        &self,
        sub: SubscriptionId,
        seq: u64,
        result: Result<OverviewSet, FetchError>,
    ) -> ApplyOutcome {
        let mut inner = self.lock();
        if let Err(outcome) = inner.admit(sub, seq) {
            debug!(seq, ?outcome, "Discarded overview completion.");
            return outcome;
        }
        let outcome = match result {
            Ok(set) => {
                inner.overview = Some(Arc::new(set));
                inner.overview_error = None;
                ApplyOutcome::Applied
            }
            Err(e) => {
                warn!(error = %e, "Overview poll failed; keeping last overview.");
                inner.overview_error = Some(OVERVIEW_ERROR);
                ApplyOutcome::Failed
            }
        };
        let version = inner.bump();
        drop(inner);
        self.publish(version);
        outcome
    }

    /// Reconciles a charts payload against the node's previous window.
    pub fn apply_charts(
        &self,
        sub: SubscriptionId,
        seq: u64,
        result: Result<RawSeriesPayload, FetchError>,
    ) -> ApplyOutcome {
        let mut inner = self.lock();
        let node_id = match inner.admit(sub, seq) {
            Ok(PollTarget::Charts(node_id)) => node_id,
            Ok(target) => {
                warn!(%target, "Charts completion delivered to a non-charts subscription.");
                return ApplyOutcome::Stale;
            }
            Err(outcome) => {
                debug!(seq, ?outcome, "Discarded charts completion.");
                return outcome;
            }
        };
        let entry = inner.charts.entry(node_id.clone()).or_default();
        let outcome = match result {
            Ok(raw) => {
                let window = reconcile(entry.window.as_deref(), raw, &node_id);
                entry.window = Some(Arc::new(window));
                entry.error = None;
                ApplyOutcome::Applied
            }
            Err(e) => {
                warn!(node_id = %node_id, error = %e, "Charts poll failed; keeping last window.");
                entry.error = Some(CHARTS_ERROR);
                ApplyOutcome::Failed
            }
        };
        let version = inner.bump();
        drop(inner);
        self.publish(version);
        outcome
    }

    /// Stores the navigation index, fetched once at startup.
    pub fn set_nodes(&self, result: Result<NodesIndex, FetchError>) {
        let mut inner = self.lock();
        match result {
            Ok(index) => {
                info!(title = %index.title, count = index.nodes.len(), "Loaded node list.");
                inner.nodes = Some(Arc::new(index));
                inner.nodes_error = None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to load node list.");
                inner.nodes_error = Some(NODES_ERROR);
            }
        }
        let version = inner.bump();
        drop(inner);
        self.publish(version);
    }

    pub fn nodes(&self) -> Option<Arc<NodesIndex>> {
        self.lock().nodes.clone()
    }

    pub fn nodes_error(&self) -> Option<&'static str> {
        self.lock().nodes_error
    }

    pub fn overview(&self) -> Option<Arc<OverviewSet>> {
        self.lock().overview.clone()
    }

    pub fn overview_error(&self) -> Option<&'static str> {
        self.lock().overview_error
    }

    pub fn charts(&self, node_id: &str) -> Option<Arc<TimeSeriesWindow>> {
        self.lock()
            .charts
            .get(node_id)
            .and_then(|entry| entry.window.clone())
    }

    pub fn charts_error(&self, node_id: &str) -> Option<&'static str> {
        self.lock().charts.get(node_id).and_then(|entry| entry.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodenexus_common::model::{NodeSnapshot, PercentSample};

    fn overview(update_at: i64) -> OverviewSet {
        OverviewSet {
            update_at,
            nodes: vec![NodeSnapshot {
                node_id: "node-a".into(),
                node_alive: true,
                ..Default::default()
            }],
        }
    }

    #[test]
    fn failure_keeps_previous_overview() {
        let state = DashboardState::new();
        let sub = state.register(PollTarget::Overview);

        assert_eq!(state.apply_overview(sub, 1, Ok(overview(10))), ApplyOutcome::Applied);
        assert_eq!(state.overview_error(), None);

        let outcome = state.apply_overview(sub, 2, Err(FetchError::Status(502)));
        assert_eq!(outcome, ApplyOutcome::Failed);
        assert_eq!(state.overview().unwrap().update_at, 10);
        assert_eq!(state.overview_error(), Some(OVERVIEW_ERROR));

        assert_eq!(state.apply_overview(sub, 3, Ok(overview(12))), ApplyOutcome::Applied);
        assert_eq!(state.overview_error(), None);
    }

    #[test]
    fn older_completion_is_stale() {
        let state = DashboardState::new();
        let sub = state.register(PollTarget::Overview);

        assert_eq!(state.apply_overview(sub, 5, Ok(overview(50))), ApplyOutcome::Applied);
        let version = state.version();
        assert_eq!(state.apply_overview(sub, 4, Ok(overview(40))), ApplyOutcome::Stale);
        assert_eq!(state.overview().unwrap().update_at, 50);
        assert_eq!(state.version(), version);
    }

    #[test]
    fn unregistered_subscription_is_rejected() {
        let state = DashboardState::new();
        let sub = state.register(PollTarget::Charts("node-a".into()));
        state.unregister(sub);

        let version = state.version();
        let outcome = state.apply_charts(sub, 1, Ok(RawSeriesPayload::default()));
        assert_eq!(outcome, ApplyOutcome::Cancelled);
        assert!(state.charts("node-a").is_none());
        assert_eq!(state.version(), version);
    }

    #[test]
    fn charts_are_reconciled_per_node() {
        let state = DashboardState::new();
        let sub = state.register(PollTarget::Charts("node-a".into()));
        let raw = RawSeriesPayload {
            cpu: vec![PercentSample {
                time: "t1".into(),
                value: 3.0,
            }],
            ..Default::default()
        };

        assert_eq!(state.apply_charts(sub, 1, Ok(raw.clone())), ApplyOutcome::Applied);
        assert_eq!(state.apply_charts(sub, 2, Ok(raw)), ApplyOutcome::Applied);
        let window = state.charts("node-a").unwrap();
        assert_eq!(window.generation, 2);
        assert_eq!(window.node_id, "node-a");

        assert_eq!(
            state.apply_charts(sub, 3, Err(FetchError::Parse("eof".into()))),
            ApplyOutcome::Failed
        );
        assert_eq!(state.charts("node-a").unwrap().generation, 2);
        assert_eq!(state.charts_error("node-a"), Some(CHARTS_ERROR));
        assert_eq!(state.charts_error("node-b"), None);
    }

    #[tokio::test]
    async fn changes_are_broadcast() {
        let state = DashboardState::new();
        let mut changes = state.subscribe_changes();
        state.set_nodes(Err(FetchError::Transport("refused".into())));
        changes.changed().await.unwrap();
        assert_eq!(*changes.borrow(), 1);
        assert_eq!(state.nodes_error(), Some(NODES_ERROR));
        assert!(state.nodes().is_none());
    }
}
