//! Live overview page.
use nodenexus_common::model::OverviewSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::poller::{PollHandle, PollTarget, Poller};
use crate::state::DashboardState;
use crate::view::layout::{node_summary, NodeSummary};

/// One rendered frame of the overview page.
#[derive(Debug, Clone, PartialEq)]
pub struct OverviewFrame {
    pub update_at: i64,
    pub online: usize,
    pub nodes: Vec<NodeSummary>,
    /// Banner text when the latest poll failed. `nodes` then holds the last
    /// successfully fetched data.
    pub error: Option<&'static str>,
}

/// Receives overview frames; the page-composition layer implements this.
pub trait OverviewSink: Send + Sync + 'static {
    fn show(&self, frame: OverviewFrame);
}

/// Sink that writes each frame to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl OverviewSink for LogSink {
    fn show(&self, frame: OverviewFrame) {
        if let Some(error) = frame.error {
            warn!(banner = error, "Overview is stale.");
        }
        info!(
            update_at = frame.update_at,
            online = frame.online,
            total = frame.nodes.len(),
            "Overview updated."
        );
        for node in &frame.nodes {
            info!(
                node_id = %node.node_id,
                name = %node.name,
                online = node.online,
                cpu = %node.cpu,
                memory = %node.memory,
                load = %node.load,
                network = %node.network_speed,
                uptime = %node.uptime,
                "Node status."
            );
        }
    }
}

pub struct OverviewView {
    poll: PollHandle,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl OverviewView {
    pub fn mount(poller: &Poller, interval: Duration, sink: Arc<dyn OverviewSink>) -> Self {
        let state = poller.state().clone();
        let changes = state.subscribe_changes();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_view(state, changes, sink, shutdown_rx));
        let poll = poller.start(PollTarget::Overview, interval);
        info!("Overview view mounted.");
        Self {
            poll,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    pub async fn unmount(mut self) {
        self.poll.cancel();
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Overview view task ended abnormally.");
            }
        }
        info!("Overview view unmounted.");
    }
}

impl Drop for OverviewView {
    fn drop(&mut self) {
        self.poll.cancel();
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

async fn run_view(
    state: DashboardState,
    mut changes: watch::Receiver<u64>,
    sink: Arc<dyn OverviewSink>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut shown: Option<(Arc<OverviewSet>, Option<&'static str>)> = None;
    loop {
        if let Some(set) = state.overview() {
            let error = state.overview_error();
            let unchanged = shown
                .as_ref()
                .is_some_and(|(last, last_error)| Arc::ptr_eq(last, &set) && *last_error == error);
            if !unchanged {
                sink.show(frame(&set, error));
                shown = Some((set, error));
            }
        }

        tokio::select! {
            biased;

            _ = &mut shutdown_rx => break,

            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

fn frame(set: &OverviewSet, error: Option<&'static str>) -> OverviewFrame {
    OverviewFrame {
        update_at: set.update_at,
        online: set.alive_count(),
        nodes: set.nodes.iter().map(node_summary).collect(),
        error,
    }
}
