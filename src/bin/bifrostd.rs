//! bifrostd: the Bifrost HTTP daemon.
//!
//! Serves the gateway's dispatcher, generation handler and stream ingestion
//! over plain HTTP.

use std::net::SocketAddr;

use clap::Parser;
use tracing::info;

use bifrost::config::{Config, Secrets};
use bifrost::{Bifrost, BifrostError};

/// Bifrost daemon, the inference dispatch gateway.
#[derive(Parser)]
#[command(name = "bifrostd")]
#[command(version = bifrost::version::PKG_VERSION)]
#[command(about = "Bifrost inference dispatch daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Listen address, overriding the configured one.
    #[arg(short, long, env = "BIFROST_ADDRESS")]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: info for the daemon; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    let address = args.address.unwrap_or_else(|| config.server.address.clone());
    let addr: SocketAddr = address
        .parse()
        .map_err(|e| BifrostError::Configuration(format!("Invalid address: {e}")))?;

    let gateway = Bifrost::builder().config(config).secrets(secrets).build()?;

    info!(version = bifrost::version::version_string(), %addr, "bifrostd starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, bifrost::server::router(gateway))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("bifrostd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
