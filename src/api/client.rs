use async_trait::async_trait;
use nodenexus_common::model::{NodesIndex, OverviewSet, RawSeriesPayload};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::api::{ChartRange, MetricsSource};
use crate::config::{DashboardConfig, Endpoints};
use crate::error::FetchError;
use crate::version::user_agent;

/// HTTP client for the status API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    endpoints: Endpoints,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        endpoints: Endpoints,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            endpoints,
        })
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self, FetchError> {
        Self::new(
            &config.api_base_url,
            config.endpoints.clone(),
            config.request_timeout(),
        )
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Non-2xx statuses and undecodable bodies are both failures; the body is
    /// only parsed once the status is known to be successful.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = self.url(path);
        let response = self.http.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(%url, status = status.as_u16(), "API request returned an error status.");
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl MetricsSource for ApiClient {
    async fn nodes(&self) -> Result<NodesIndex, FetchError> {
        self.get_json(&self.endpoints.nodes, &[]).await
    }

    async fn overview(&self) -> Result<OverviewSet, FetchError> {
        self.get_json(&self.endpoints.overview, &[]).await
    }

    async fn charts(
        &self,
        node_id: &str,
        range: Option<ChartRange>,
    ) -> Result<RawSeriesPayload, FetchError> {
        let mut query = vec![("id", node_id.to_string())];
        if let Some(range) = range {
            query.push(("start", range.start.to_string()));
            query.push(("end", range.end.to_string()));
        }
        self.get_json(&self.endpoints.charts, &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joining() {
        let client = ApiClient::new(
            "http://localhost:8080/",
            Endpoints::default(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.url("/api/nodes"), "http://localhost:8080/api/nodes");
        assert_eq!(client.url("api/nodes"), "http://localhost:8080/api/nodes");
    }
}
