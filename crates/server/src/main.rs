//! Horizon Relay daemon (relayd)

use anyhow::Result;
use clap::Parser;
use horizon_relay_server::config::{Cli, RelayConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Horizon Relay v{}", env!("CARGO_PKG_VERSION"));

    let config = RelayConfig::from_cli(Cli::parse())?;
    horizon_relay_server::run(config).await
}
