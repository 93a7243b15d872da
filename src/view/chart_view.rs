//! Per-node chart page: a charts poller, one resize listener and the surfaces.
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::charts::{ChartBackend, ChartSurfaceManager};
use crate::poller::{PollHandle, PollTarget, Poller};
use crate::state::DashboardState;
use crate::view::layout::chart_layout;
use crate::viewport::{Viewport, ViewportEvents};

pub struct ChartView {
    node_id: String,
    poll: PollHandle,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ChartView {
    pub fn mount(
        poller: &Poller,
        node_id: &str,
        interval: Duration,
        backend: Box<dyn ChartBackend>,
        viewport_events: &ViewportEvents,
        viewport: Viewport,
    ) -> Self {
        let state = poller.state().clone();
        let changes = state.subscribe_changes();
        let resize_rx = viewport_events.subscribe();
        let manager = ChartSurfaceManager::new(node_id, backend, viewport);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(run_view(
            node_id.to_string(),
            state,
            manager,
            changes,
            resize_rx,
            shutdown_rx,
        ));
        let poll = poller.start(PollTarget::Charts(node_id.to_string()), interval);
        info!(node_id, "Chart view mounted.");

        Self {
            node_id: node_id.to_string(),
            poll,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Stops polling first, then the listener, then releases every surface.
    pub async fn unmount(mut self) {
        self.poll.cancel();
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(node_id = %self.node_id, error = %e, "Chart view task ended abnormally.");
            }
        }
        info!(node_id = %self.node_id, "Chart view unmounted.");
    }
}

impl Drop for ChartView {
    fn drop(&mut self) {
        self.poll.cancel();
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

async fn run_view(
    node_id: String,
    state: DashboardState,
    mut manager: ChartSurfaceManager,
    mut changes: watch::Receiver<u64>,
    mut resize_rx: broadcast::Receiver<Viewport>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut listening = true;
    let mut shown_error: Option<&'static str> = None;
    render_latest(&state, &node_id, &mut manager, &mut shown_error);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown_rx => break,

            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                render_latest(&state, &node_id, &mut manager, &mut shown_error);
            }

            event = resize_rx.recv(), if listening => match event {
                Ok(viewport) => {
                    manager.resize(viewport);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(node_id = %node_id, skipped, "Coalesced viewport events.");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    listening = false;
                }
            },
        }
    }

    manager.unmount();
}

fn render_latest(
    state: &DashboardState,
    node_id: &str,
    manager: &mut ChartSurfaceManager,
    shown_error: &mut Option<&'static str>,
) {
    if let Some(window) = state.charts(node_id) {
        if manager.last_generation() != Some(window.generation) {
            let layout = chart_layout(&window);
            manager.render(&window, &layout);
        }
    }

    // A failed poll keeps the window generation, so the banner is checked
    // on every change.
    let error = state.charts_error(node_id);
    if error == *shown_error {
        return;
    }
    match error {
        Some(message) => warn!(node_id, banner = message, "Charts are stale."),
        None => info!(node_id, "Chart data recovered."),
    }
    manager.set_banner(error);
    *shown_error = error;
}
