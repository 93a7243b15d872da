//! Viewport size changes, fanned out to mounted views.
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

/// Broadcast source of viewport changes. Each mounted view subscribes exactly
/// once, so the number of listeners follows the number of views, not charts.
#[derive(Clone, Debug)]
pub struct ViewportEvents {
    sender: broadcast::Sender<Viewport>,
}

impl Default for ViewportEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Viewport> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Announces a new viewport; returns how many listeners received it.
    pub fn resize(&self, viewport: Viewport) -> usize {
        match self.sender.send(viewport) {
            Ok(count) => count,
            Err(_) => {
                debug!(?viewport, "Viewport changed with no view mounted.");
                0
            }
        }
    }
}

/// Re-reads the `[viewport]` table of the config file on every SIGHUP and
/// announces it.
#[cfg(unix)]
pub fn spawn_sighup_reload(
    config_path: Option<String>,
    events: ViewportEvents,
) -> tokio::task::JoinHandle<()> {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "Failed to install SIGHUP handler; viewport reload disabled.");
                return;
            }
        };
        while hangup.recv().await.is_some() {
            match crate::config::DashboardConfig::load(config_path.as_deref()) {
                Ok(config) => {
                    let delivered = events.resize(config.viewport);
                    info!(viewport = ?config.viewport, listeners = delivered, "Viewport reloaded.");
                }
                Err(e) => error!(error = %e, "Failed to reload viewport from config."),
            }
        }
    })
}
