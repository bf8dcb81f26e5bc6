//! Horizon Relay server: bridges the FH4 UDP telemetry stream to WebSocket
//! viewers.
//!
//! One port carries both sides: a UDP listener for the game's "Data Out"
//! stream and a TCP listener for the HTTP/WebSocket viewer surface. The
//! ingestion loop, the expiry sweep, and the per-viewer sessions run as
//! separate tasks; the two registries are the only shared state, each behind
//! its own lock.

use std::net::Ipv4Addr;
use std::sync::Arc;

use anyhow::{Context, Result};
use horizon_relay_players::PlayerRegistry;
use parking_lot::Mutex;
use tokio::net::{TcpListener, UdpSocket};
use tracing::info;

pub mod clients;
pub mod config;
pub mod http;
pub mod ingest;

use clients::ClientRegistry;
use config::RelayConfig;
use http::AppState;

/// Bind both listeners and run the relay until the process ends.
///
/// # Errors
/// Fails fast when either socket cannot be bound (unrecoverable
/// configuration error) or if the HTTP server loop fails.
pub async fn run(config: RelayConfig) -> Result<()> {
    let players = Arc::new(Mutex::new(PlayerRegistry::new()));
    let clients = ClientRegistry::new();

    let udp = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, config.port))
        .await
        .with_context(|| format!("failed to bind UDP telemetry socket on port {}", config.port))?;
    let tcp = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.port))
        .await
        .with_context(|| format!("failed to bind HTTP listener on port {}", config.port))?;
    info!(
        port = config.port,
        "listening for FH4 telemetry (UDP) and viewers (HTTP)"
    );

    let state = AppState {
        clients: clients.clone(),
        players: players.clone(),
        client_dir: Arc::new(config.client_dir),
    };

    tokio::spawn(ingest::run_expiry_sweep(players.clone()));
    tokio::spawn(ingest::run_ingest(udp, players, clients));

    http::serve(tcp, state).await
}
