//! Owns the active route and the view mounted for it.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::MetricsSource;
use crate::charts::ChartBackend;
use crate::config::DashboardConfig;
use crate::poller::Poller;
use crate::view::chart_view::ChartView;
use crate::view::overview::{OverviewSink, OverviewView};
use crate::viewport::{Viewport, ViewportEvents};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Overview,
    Node(String),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Overview => write!(f, "/"),
            Route::Node(id) => write!(f, "/charts/{id}"),
        }
    }
}

enum MountedView {
    Overview(OverviewView),
    Charts(ChartView),
}

pub type BackendFactory = Arc<dyn Fn() -> Box<dyn ChartBackend> + Send + Sync>;

/// Cadences and sizes the navigator hands to each view it mounts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSettings {
    pub overview_interval: Duration,
    pub charts_interval: Duration,
    pub viewport: Viewport,
}

impl From<&DashboardConfig> for ViewSettings {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            overview_interval: config.overview_interval(),
            charts_interval: config.charts_interval(),
            viewport: config.viewport,
        }
    }
}

pub struct Navigator {
    poller: Poller,
    settings: ViewSettings,
    viewport_events: ViewportEvents,
    backend_factory: BackendFactory,
    sink: Arc<dyn OverviewSink>,
    route: Option<Route>,
    mounted: Option<MountedView>,
}

impl Navigator {
    pub fn new(
        poller: Poller,
        settings: ViewSettings,
        viewport_events: ViewportEvents,
        backend_factory: BackendFactory,
        sink: Arc<dyn OverviewSink>,
    ) -> Self {
        Self {
            poller,
            settings,
            viewport_events,
            backend_factory,
            sink,
            route: None,
            mounted: None,
        }
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    /// Fetches the node list once and stores it. A failure leaves the
    /// navigation error set; the dashboard keeps running.
    pub async fn load_nodes(&self, source: &dyn MetricsSource) {
        let result = source.nodes().await;
        self.poller.state().set_nodes(result);
    }

    /// Unmounts the current view, then mounts the one for `route`.
    /// Navigating to the active route does nothing.
    pub async fn navigate(&mut self, route: Route) {
        if self.route.as_ref() == Some(&route) {
            return;
        }

        if let Route::Node(node_id) = &route {
            let known = self
                .poller
                .state()
                .nodes()
                .map(|index| index.nodes.iter().any(|n| &n.id == node_id));
            if known == Some(false) {
                warn!(node_id = %node_id, "Navigating to a node missing from the node list.");
            }
        }

        self.unmount().await;

        info!(%route, "Navigating.");
        let view = match &route {
            Route::Overview => MountedView::Overview(OverviewView::mount(
                &self.poller,
                self.settings.overview_interval,
                self.sink.clone(),
            )),
            Route::Node(node_id) => MountedView::Charts(ChartView::mount(
                &self.poller,
                node_id,
                self.settings.charts_interval,
                (self.backend_factory)(),
                &self.viewport_events,
                self.settings.viewport,
            )),
        };
        self.mounted = Some(view);
        self.route = Some(route);
    }

    /// Tears down the active view, if any.
    pub async fn unmount(&mut self) {
        self.route = None;
        match self.mounted.take() {
            Some(MountedView::Overview(view)) => view.unmount().await,
            Some(MountedView::Charts(view)) => view.unmount().await,
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChartRange;
    use crate::charts::manager::tests::{Call, RecordingBackend};
    use crate::charts::ChartFamily;
    use crate::error::FetchError;
    use crate::state::{DashboardState, NODES_ERROR};
    use crate::view::overview::OverviewFrame;
    use async_trait::async_trait;
    use nodenexus_common::model::{
        NodeMeta, NodesIndex, OverviewSet, PercentSample, RawSeriesPayload,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StaticSource {
        charts_calls: AtomicUsize,
        overview_calls: AtomicUsize,
        nodes_fail: bool,
    }

    #[async_trait]
    impl MetricsSource for StaticSource {
        async fn nodes(&self) -> Result<NodesIndex, FetchError> {
            if self.nodes_fail {
                return Err(FetchError::Status(503));
            }
            Ok(NodesIndex {
                title: "Status".into(),
                nodes: vec![NodeMeta {
                    id: "hk".into(),
                    ..Default::default()
                }],
            })
        }

        async fn overview(&self) -> Result<OverviewSet, FetchError> {
            self.overview_calls.fetch_add(1, Ordering::SeqCst);
            Ok(OverviewSet::default())
        }

        async fn charts(
            &self,
            _node_id: &str,
            _range: Option<ChartRange>,
        ) -> Result<RawSeriesPayload, FetchError> {
            self.charts_calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawSeriesPayload {
                cpu: vec![PercentSample {
                    time: "t1".into(),
                    value: 5.0,
                }],
                ..Default::default()
            })
        }
    }

    struct NullSink;

    impl OverviewSink for NullSink {
        fn show(&self, _frame: OverviewFrame) {}
    }

    fn navigator(
        source: Arc<StaticSource>,
        backend: RecordingBackend,
        events: ViewportEvents,
    ) -> Navigator {
        let poller = Poller::new(source, DashboardState::new());
        let settings = ViewSettings {
            overview_interval: Duration::from_secs(2),
            charts_interval: Duration::from_secs(30),
            viewport: Viewport::default(),
        };
        let factory: BackendFactory =
            Arc::new(move || Box::new(backend.clone()) as Box<dyn ChartBackend>);
        Navigator::new(poller, settings, events, factory, Arc::new(NullSink))
    }

    #[tokio::test(start_paused = true)]
    async fn switching_routes_stops_previous_view() {
        let source = Arc::new(StaticSource::default());
        let backend = RecordingBackend::default();
        let events = ViewportEvents::new();
        let mut nav = navigator(source.clone(), backend.clone(), events.clone());

        nav.load_nodes(source.as_ref()).await;
        nav.navigate(Route::Node("hk".into())).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(source.charts_calls.load(Ordering::SeqCst), 1);
        assert_eq!(events.listener_count(), 1);
        assert_eq!(backend.count(|c| *c == Call::Init(ChartFamily::Cpu)), 1);

        let viewport = Viewport { width: 900, height: 600 };
        events.resize(viewport);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.count(|c| *c == Call::Resize(ChartFamily::Cpu, viewport)), 1);

        nav.navigate(Route::Overview).await;
        assert_eq!(nav.route(), Some(&Route::Overview));
        assert_eq!(events.listener_count(), 0);
        assert_eq!(backend.count(|c| *c == Call::Dispose(ChartFamily::Cpu)), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(source.charts_calls.load(Ordering::SeqCst), 1);
        assert!(source.overview_calls.load(Ordering::SeqCst) >= 60);

        nav.unmount().await;
        let calls = source.overview_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(source.overview_calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn node_list_failure_sets_navigation_error() {
        let source = Arc::new(StaticSource {
            nodes_fail: true,
            ..Default::default()
        });
        let nav = navigator(source.clone(), RecordingBackend::default(), ViewportEvents::new());
        nav.load_nodes(source.as_ref()).await;
        assert_eq!(nav.poller.state().nodes_error(), Some(NODES_ERROR));
    }
}
