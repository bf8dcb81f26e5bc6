//! Runtime configuration for `relayd`.
//!
//! One port serves both listeners (UDP telemetry in, HTTP/WebSocket out), as
//! the game's companion tooling expects. Precedence: `--port` flag, then the
//! `PORT` environment variable, then [`DEFAULT_PORT`]. A `PORT` value that is
//! set but unparsable is a configuration error, not a silent fallback.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 42069;
pub const DEFAULT_CLIENT_DIR: &str = "client";

#[derive(Debug, Parser)]
#[command(name = "relayd", version, about = "Forza Horizon 4 telemetry relay")]
pub struct Cli {
    /// Port shared by the UDP telemetry listener and the HTTP/WebSocket
    /// endpoint (falls back to $PORT, then 42069).
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding the viewer front-end assets.
    #[arg(long, default_value = DEFAULT_CLIENT_DIR)]
    pub client_dir: PathBuf,
}

/// Resolved relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub port: u16,
    pub client_dir: PathBuf,
}

impl RelayConfig {
    /// Resolve configuration from parsed CLI arguments and the environment.
    ///
    /// # Errors
    /// Fails when `PORT` is set but is not a valid port number.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let port = resolve_port(cli.port, env::var("PORT").ok().as_deref())?;
        Ok(Self {
            port,
            client_dir: cli.client_dir,
        })
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            client_dir: PathBuf::from(DEFAULT_CLIENT_DIR),
        }
    }
}

fn resolve_port(cli_port: Option<u16>, env_port: Option<&str>) -> Result<u16> {
    if let Some(port) = cli_port {
        return Ok(port);
    }
    match env_port {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("PORT environment variable is not a valid port: {value:?}")),
        None => Ok(DEFAULT_PORT),
    }
}
