//! Standalone mock Orderwise API for manual runs.

use clap::Parser;
use tokio::net::TcpListener;

use orderwise_bridge::config::ObservabilityConfig;
use orderwise_bridge::lifecycle::signals;
use orderwise_bridge::mock::{self, MockState};
use orderwise_bridge::observability::logging;

#[derive(Parser)]
#[command(name = "mock-api")]
#[command(about = "Mock Orderwise API and external webhook", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "127.0.0.1:3001")]
    bind: String,

    #[arg(long, default_value = "debug")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init_logging(&ObservabilityConfig {
        log_level: args.log_level,
        ..ObservabilityConfig::default()
    });

    let listener = TcpListener::bind(&args.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "Mock API server running");

    axum::serve(listener, mock::router(MockState::default()))
        .with_graceful_shutdown(signals::wait_for_signal())
        .await?;

    tracing::info!("Mock API server stopped");
    Ok(())
}
