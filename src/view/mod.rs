//! Views mounted by the navigator and the pure layout functions they use.
pub mod chart_view;
pub mod layout;
pub mod navigator;
pub mod overview;

pub use chart_view::ChartView;
pub use layout::{chart_layout, node_summary, ChartLayout, NodeSummary, SurfaceSpec};
pub use navigator::{BackendFactory, Navigator, Route, ViewSettings};
pub use overview::{LogSink, OverviewFrame, OverviewSink, OverviewView};
