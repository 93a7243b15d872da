use clap::Parser;
use nodenexus_dashboard::api::ApiClient;
use nodenexus_dashboard::charts::{ChartBackend, FileChartBackend};
use nodenexus_dashboard::config::DashboardConfig;
use nodenexus_dashboard::logging::init_logging;
use nodenexus_dashboard::poller::Poller;
use nodenexus_dashboard::state::DashboardState;
use nodenexus_dashboard::version::VERSION;
use nodenexus_dashboard::view::{BackendFactory, LogSink, Navigator, Route, ViewSettings};
use nodenexus_dashboard::viewport::ViewportEvents;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Open the chart page of this node instead of the overview
    #[arg(short, long)]
    node: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if std::env::args().any(|arg| arg == "--version") {
        println!("Dashboard version: {VERSION}");
        return Ok(());
    }

    let args = Args::parse();

    let config = match DashboardConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load dashboard configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!(version = VERSION, api = %config.api_base_url, "Starting dashboard.");

    let client = Arc::new(ApiClient::from_config(&config)?);
    let state = DashboardState::new();
    let poller =
        Poller::new(client.clone(), state.clone()).with_charts_window(config.charts_window_secs);

    let viewport_events = ViewportEvents::new();
    #[cfg(unix)]
    let sighup_task = nodenexus_dashboard::viewport::spawn_sighup_reload(
        args.config.clone(),
        viewport_events.clone(),
    );

    let output_dir = config.output_dir.clone();
    let backend_factory: BackendFactory = Arc::new(move || {
        Box::new(FileChartBackend::new(output_dir.clone())) as Box<dyn ChartBackend>
    });

    let mut navigator = Navigator::new(
        poller,
        ViewSettings::from(&config),
        viewport_events,
        backend_factory,
        Arc::new(LogSink),
    );

    // The node list is fetched once per start, like a page load.
    navigator.load_nodes(client.as_ref()).await;
    if let Some(message) = state.nodes_error() {
        warn!(banner = message, "Continuing without node list.");
    }

    let route = match args.node {
        Some(node_id) => Route::Node(node_id),
        None => Route::Overview,
    };
    navigator.navigate(route).await;

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received, shutting down."),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl-C; shutting down."),
    }

    navigator.unmount().await;
    #[cfg(unix)]
    sighup_task.abort();

    info!("Dashboard stopped.");
    Ok(())
}
