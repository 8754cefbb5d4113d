use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use taskdash::cli::Cli;
use taskdash::config::Config;
use taskdash::core::backends::{DownloadAdapter, TaskTransport, TranscriptionAdapter};
use taskdash::core::debug_logger::get_debug_logger;
use taskdash::core::network::{FailoverProxy, HttpClientTrait, IsahcHttpClient, NetworkProbe};
use taskdash::core::poller::{DashboardState, Poller};
use taskdash::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();

    // Handle configuration commands
    if cli.init {
        let path = Config::init()?;
        println!("Config written to {}", path.display());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if cli.print {
        config.print()?;
        return Ok(());
    }

    if cli.check {
        config.check()?;
        println!("✓ Configuration valid");
        return Ok(());
    }

    config.check()?;

    let http_client: Arc<dyn HttpClientTrait> = Arc::new(IsahcHttpClient::new()?);
    let probe = Arc::new(NetworkProbe::new(&config, http_client.clone()));
    let proxy = Arc::new(FailoverProxy::new(&config, http_client, probe));

    if cli.health {
        let report = proxy.health_report().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let transport: Arc<dyn TaskTransport> = proxy.clone();
    let dashboard = Arc::new(DashboardState::new(
        Arc::new(DownloadAdapter::new(transport.clone())),
        Arc::new(TranscriptionAdapter::new(transport)),
        proxy.clone(),
        config.polling.recent_tasks,
    ));

    // Polling stops when the handle goes out of scope at shutdown
    let _poll_handle = Poller::new(
        dashboard.clone(),
        Duration::from_millis(config.polling.interval_ms),
    )
    .start();

    let state = Arc::new(AppState {
        proxy,
        dashboard,
        logs: config.logs.clone(),
    });

    let addr: SocketAddr = config.server.bind.parse()?;
    get_debug_logger().debug("server", "listening", &format!("taskdash listening on {}", addr));
    println!("taskdash listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, server::router(state)).await?;

    Ok(())
}
