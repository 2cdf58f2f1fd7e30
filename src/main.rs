//! Orderwise bridge service.
//!
//! ```text
//!                     ┌───────────────────────────────────────────────┐
//!                     │                ORDERWISE BRIDGE               │
//!                     │                                               │
//!   UI / bridge-cli   │  ┌──────────┐     ┌──────────┐                │
//!   ──────────────────┼─▶│  admin   │────▶│  bridge  │                │
//!                     │  │   API    │     │          │                │
//!                     │  └────┬─────┘     └────┬─────┘                │
//!                     │       │ live logs      │                      │
//!                     │       │                ▼                      │   Orderwise API
//!                     │  ┌────┴─────┐     ┌──────────┐  retry/backoff │ ◀────────────▶
//!                     │  │  audit   │◀────│  client  │────────────────┼──▶ webhook
//!                     │  │   log    │     └────┬─────┘                │
//!                     │  └────┬─────┘          │ ApiConfig            │
//!                     │       │           ┌────┴─────┐                │
//!                     │       └──────────▶│  config  │                │
//!                     │     SQLite        │  store   │                │
//!                     │                   └──────────┘                │
//!                     └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use orderwise_bridge::admin::{self, AdminState};
use orderwise_bridge::config::load_or_default;
use orderwise_bridge::lifecycle::{self, service, signals, Shutdown};
use orderwise_bridge::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "orderwise-bridge")]
#[command(about = "Orderwise to webhook bridge service", version)]
struct Args {
    /// Service configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(args.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "orderwise-bridge starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let core = lifecycle::initialize(&config).await?;
    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(service::run_heartbeat(
        core.bridge.clone(),
        Duration::from_secs(config.service.heartbeat_interval_secs),
        shutdown.subscribe(),
    )));

    if config.service.sync_enabled {
        tracing::info!(interval_secs = config.service.sync_interval_secs, "Scheduled sync enabled");
        tasks.push(tokio::spawn(service::run_sync(
            core.bridge.clone(),
            Duration::from_secs(config.service.sync_interval_secs),
            shutdown.subscribe(),
        )));
    }

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState::new(core.clone(), &config.admin.api_key, shutdown.clone());
        let router = admin::setup_admin_router(
            state,
            Duration::from_secs(config.admin.request_timeout_secs),
        );
        let rx = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = admin::serve(listener, router, rx).await {
                tracing::error!(error = %e, "Admin API failed");
            }
        }));
    }

    tracing::info!("Orderwise bridge started");
    Shutdown::wait(shutdown.subscribe()).await;

    for task in tasks {
        let _ = task.await;
    }
    lifecycle::teardown(&core).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
