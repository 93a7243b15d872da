use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::DashboardError;
use crate::viewport::Viewport;

const ENV_PREFIX: &str = "NODENEXUS_DASHBOARD_";

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub nodes: String,
    pub overview: String,
    pub charts: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            nodes: "/api/nodes".to_string(),
            overview: "/api/overview".to_string(),
            charts: "/api/charts".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    /// Live overview cadence.
    pub overview_interval_ms: u64,
    /// Time-series cadence; windowed queries are far more expensive than point reads.
    pub charts_interval_ms: u64,
    /// When set, chart requests ask for `[now - window, now]` instead of the server default.
    pub charts_window_secs: Option<u64>,
    pub output_dir: String,
    pub log_dir: String,
    pub endpoints: Endpoints,
    pub viewport: Viewport,
}

// Partial config for layering; the file nests endpoints and viewport in tables
#[derive(Deserialize, Default, Debug)]
struct PartialDashboardConfig {
    api_base_url: Option<String>,
    request_timeout_ms: Option<u64>,
    overview_interval_ms: Option<u64>,
    charts_interval_ms: Option<u64>,
    charts_window_secs: Option<u64>,
    output_dir: Option<String>,
    log_dir: Option<String>,
    endpoints: Option<PartialEndpoints>,
    viewport: Option<PartialViewport>,
}

#[derive(Deserialize, Default, Debug)]
struct PartialEndpoints {
    nodes: Option<String>,
    overview: Option<String>,
    charts: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
struct PartialViewport {
    width: Option<u32>,
    height: Option<u32>,
}

// Environment variables are flat, e.g. NODENEXUS_DASHBOARD_ENDPOINTS_CHARTS
#[derive(Deserialize, Default, Debug)]
struct PartialEnvConfig {
    api_base_url: Option<String>,
    request_timeout_ms: Option<u64>,
    overview_interval_ms: Option<u64>,
    charts_interval_ms: Option<u64>,
    charts_window_secs: Option<u64>,
    output_dir: Option<String>,
    log_dir: Option<String>,
    endpoints_nodes: Option<String>,
    endpoints_overview: Option<String>,
    endpoints_charts: Option<String>,
    viewport_width: Option<u32>,
    viewport_height: Option<u32>,
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_output_dir() -> String {
    "charts".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_ms: 10_000,
            overview_interval_ms: 2_000,
            charts_interval_ms: 30_000,
            charts_window_secs: None,
            output_dir: default_output_dir(),
            log_dir: default_log_dir(),
            endpoints: Endpoints::default(),
            viewport: Viewport::default(),
        }
    }
}

impl DashboardConfig {
    /// Loads `.env`, the optional TOML file, then `NODENEXUS_DASHBOARD_*`
    /// environment variables. Environment wins over the file.
    pub fn load(config_path: Option<&str>) -> Result<Self, DashboardError> {
        dotenv::dotenv().ok();

        let file_contents = match config_path {
            Some(path_str) => {
                let path = Path::new(path_str);
                if path.exists() {
                    Some(fs::read_to_string(path).map_err(|e| {
                        DashboardError::Config(format!(
                            "Failed to read config file at {path:?}: {e}"
                        ))
                    })?)
                } else {
                    None
                }
            }
            None => None,
        };

        Self::from_sources(file_contents.as_deref(), std::env::vars())
    }

    /// Merges file contents and environment pairs over the defaults.
    pub fn from_sources<I>(file_contents: Option<&str>, env: I) -> Result<Self, DashboardError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        // 1. File layer (optional)
        let file_config: PartialDashboardConfig = match file_contents {
            Some(contents) => toml::from_str(contents).map_err(|e| {
                DashboardError::Config(format!("Failed to parse TOML config: {e}"))
            })?,
            None => PartialDashboardConfig::default(),
        };

        // 2. Environment layer
        let env_config: PartialEnvConfig = envy::prefixed(ENV_PREFIX)
            .from_iter(env.into_iter().filter(|(key, _)| key.starts_with(ENV_PREFIX)))
            .map_err(|e| {
                DashboardError::Config(format!("Failed to load config from environment: {e}"))
            })?;

        // 3. Merge: environment overrides file
        let defaults = Self::default();
        let file_endpoints = file_config.endpoints.unwrap_or_default();
        let file_viewport = file_config.viewport.unwrap_or_default();
        let config = DashboardConfig {
            api_base_url: env_config
                .api_base_url
                .or(file_config.api_base_url)
                .unwrap_or(defaults.api_base_url),
            request_timeout_ms: env_config
                .request_timeout_ms
                .or(file_config.request_timeout_ms)
                .unwrap_or(defaults.request_timeout_ms),
            overview_interval_ms: env_config
                .overview_interval_ms
                .or(file_config.overview_interval_ms)
                .unwrap_or(defaults.overview_interval_ms),
            charts_interval_ms: env_config
                .charts_interval_ms
                .or(file_config.charts_interval_ms)
                .unwrap_or(defaults.charts_interval_ms),
            charts_window_secs: env_config
                .charts_window_secs
                .or(file_config.charts_window_secs),
            output_dir: env_config
                .output_dir
                .or(file_config.output_dir)
                .unwrap_or(defaults.output_dir),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or(defaults.log_dir),
            endpoints: Endpoints {
                nodes: env_config
                    .endpoints_nodes
                    .or(file_endpoints.nodes)
                    .unwrap_or(defaults.endpoints.nodes),
                overview: env_config
                    .endpoints_overview
                    .or(file_endpoints.overview)
                    .unwrap_or(defaults.endpoints.overview),
                charts: env_config
                    .endpoints_charts
                    .or(file_endpoints.charts)
                    .unwrap_or(defaults.endpoints.charts),
            },
            viewport: Viewport {
                width: env_config
                    .viewport_width
                    .or(file_viewport.width)
                    .unwrap_or(defaults.viewport.width),
                height: env_config
                    .viewport_height
                    .or(file_viewport.height)
                    .unwrap_or(defaults.viewport.height),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), DashboardError> {
        if self.api_base_url.trim().is_empty() {
            return Err(DashboardError::Config("api_base_url must not be empty".to_string()));
        }
        if self.overview_interval_ms == 0 || self.charts_interval_ms == 0 {
            return Err(DashboardError::Config(
                "polling intervals must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(DashboardError::Config(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.charts_window_secs == Some(0) {
            return Err(DashboardError::Config(
                "charts_window_secs must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn overview_interval(&self) -> Duration {
        Duration::from_millis(self.overview_interval_ms)
    }

    pub fn charts_interval(&self) -> Duration {
        Duration::from_millis(self.charts_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
