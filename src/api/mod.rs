//! Read side of the metrics API.
pub mod client;

use async_trait::async_trait;
use chrono::Utc;
use nodenexus_common::model::{NodesIndex, OverviewSet, RawSeriesPayload};

use crate::error::FetchError;

pub use client::ApiClient;

/// Time range of a charts request, in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartRange {
    pub start: i64,
    pub end: i64,
}

impl ChartRange {
    /// `[end - window_secs, end]`.
    pub fn trailing(window_secs: u64, end: i64) -> Self {
        let window = i64::try_from(window_secs).unwrap_or(i64::MAX);
        Self {
            start: end.saturating_sub(window),
            end,
        }
    }

    pub fn trailing_from_now(window_secs: u64) -> Self {
        Self::trailing(window_secs, Utc::now().timestamp())
    }
}

/// Anything that can answer the three dashboard queries. The HTTP client is
/// the production implementation; tests substitute scripted sources.
#[async_trait]
pub trait MetricsSource: Send + Sync + 'static {
    async fn nodes(&self) -> Result<NodesIndex, FetchError>;

    async fn overview(&self) -> Result<OverviewSet, FetchError>;

    async fn charts(
        &self,
        node_id: &str,
        range: Option<ChartRange>,
    ) -> Result<RawSeriesPayload, FetchError>;
}
