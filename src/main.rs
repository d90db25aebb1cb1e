//! Router registry daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────┐
//!                        │                ROUTER REGISTRY                │
//!                        │                                               │
//!   Backend servers      │  ┌─────────┐    ┌──────────┐    ┌──────────┐  │
//!   ─────────────────────┼─▶│  admin  │───▶│ manager  │───▶│repository│──┼──▶ router-config.json
//!   POST /admin/add      │  │ (axum)  │    │          │    │  (file)  │  │          │
//!   POST /admin/remove   │  └─────────┘    └────┬─────┘    └──────────┘  │          │
//!                        │                      │                        │          │
//!                        │                      ▼                        │          │
//!   Proxy dispatch       │               ┌──────────────┐  ┌──────────┐  │          │
//!   ◀────────────────────┼───────────────│Configuration │◀─│ watcher  │◀─┼──────────┘
//!   (lock-free reads)    │               │  (ArcSwap)   │  │ (notify) │  │  operator edits
//!                        │               └──────────────┘  └──────────┘  │
//!                        │                      ▲                        │
//!                        │               ┌──────┴───────┐                │
//!                        │               │   recovery   │                │
//!                        │               │ (ping loop)  │                │
//!                        │               └──────────────┘                │
//!                        └───────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use router_registry::admin::setup_admin_router;
use router_registry::config::loader::load_router_settings;
use router_registry::config::FileRepository;
use router_registry::health::FailedHostMonitor;
use router_registry::lifecycle::signals::spawn_signal_handler;
use router_registry::lifecycle::Shutdown;
use router_registry::observability::{logging, metrics};
use router_registry::registry::{ConfigurationManager, Scope};

#[derive(Parser)]
#[command(name = "router-registry")]
#[command(about = "Dynamic routing registry with admin API and hot reload", long_about = None)]
struct Cli {
    /// Settings file (TOML). Defaults apply when omitted.
    #[arg(short, long, env = "ROUTER_SETTINGS")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = load_router_settings(cli.config.as_deref())?;

    logging::init_logging(&settings.observability.log_filter);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "router-registry starting");

    tracing::info!(
        bind_address = %settings.listener.bind_address,
        repository = %settings.repository.dir,
        watcher_enabled = settings.repository.watcher_enabled,
        "Configuration loaded"
    );

    if settings.observability.metrics_enabled {
        match settings.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut repository = FileRepository::new(&settings.repository.dir);
    if let Some(hot_reload) = settings.repository.hot_reload() {
        repository = repository.with_hot_reload(hot_reload);
    }
    let manager = Arc::new(ConfigurationManager::new(Arc::new(repository)));

    let snapshot = manager.configuration().snapshot();
    tracing::info!(
        containers = snapshot.host_count(Scope::Container),
        servers = snapshot.host_count(Scope::Server),
        "Routing configuration ready"
    );

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let monitor = Arc::new(FailedHostMonitor::new(
        manager.clone(),
        settings.recovery.clone(),
    )?);
    let monitor_task = tokio::spawn(monitor.run(shutdown.subscribe()));

    let listener = TcpListener::bind(&settings.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Admin listener started");

    let app = setup_admin_router(manager.clone());
    let mut signal = shutdown.subscribe();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.wait().await })
        .await?;

    shutdown.trigger();
    if let Err(e) = monitor_task.await {
        tracing::error!(error = %e, "Failed host monitor task failed");
    }
    manager.close();

    tracing::info!("Shutdown complete");
    Ok(())
}
