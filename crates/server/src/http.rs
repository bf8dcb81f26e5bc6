//! HTTP surface: the `/data` WebSocket endpoint, a health probe, and the
//! static viewer assets.
//!
//! The relay only ever sends on a viewer socket; inbound frames are read
//! solely to detect the connection closing. Registration happens on upgrade;
//! deregistration only when the session ends, for any reason.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use horizon_relay_players::PlayerRegistry;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::clients::{ClientRegistry, VIEWER_QUEUE_DEPTH};

/// Shared handles for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub clients: ClientRegistry,
    pub players: Arc<Mutex<PlayerRegistry>>,
    pub client_dir: Arc<PathBuf>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/data", get(data_handler))
        .route("/healthz", get(health_handler))
        .fallback(asset_handler)
        .with_state(state)
}

/// Serve the router until the process ends.
///
/// # Errors
/// Returns the underlying I/O error if the server loop fails.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    axum::serve(listener, router(state))
        .await
        .context("HTTP server error")
}

async fn data_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| viewer_session(socket, state.clients))
}

async fn viewer_session(socket: WebSocket, clients: ClientRegistry) {
    let (tx, mut rx) = mpsc::channel::<Bytes>(VIEWER_QUEUE_DEPTH);
    let id = clients.add(tx);
    info!(viewers = clients.client_count(), "{id} connected");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            queued = rx.recv() => {
                let Some(message) = queued else { break };
                if let Err(e) = sink.send(Message::Binary(message)).await {
                    // A send failure alone does not deregister; the inbound
                    // arm observes the actual close.
                    debug!("send to {id} failed: {e}");
                }
            }
            inbound = stream.next() => {
                match inbound {
                    // Inbound frames carry no meaning; reading them only
                    // detects disconnection.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("{id} socket error: {e}");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    clients.remove(id);
    info!(viewers = clients.client_count(), "{id} disconnected");
}

async fn health_handler(State(state): State<AppState>) -> Response {
    let body = serde_json::json!({
        "status": "ok",
        "viewers": state.clients.client_count(),
        "players": state.players.lock().player_count(),
    });
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

/// Static viewer assets; `/` maps to `index.html`.
async fn asset_handler(State(state): State<AppState>, uri: Uri) -> Response {
    let trimmed = uri.path().trim_start_matches('/');
    let relative = if trimmed.is_empty() { "index.html" } else { trimmed };
    if !is_safe_asset_path(relative) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let full = state.client_dir.join(relative);
    match tokio::fs::read(&full).await {
        Ok(contents) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type_for(relative))],
            contents,
        )
            .into_response(),
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
            StatusCode::NOT_FOUND.into_response()
        }
        Err(e) => {
            error!("failed to read asset {}: {e}", full.display());
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Plain relative path only: no empty segments, no `.`/`..` traversal.
fn is_safe_asset_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

fn content_type_for(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("html") => "text/html; charset=utf-8",
        Some("js" | "mjs") => "application/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_paths_reject_traversal() {
        assert!(is_safe_asset_path("index.html"));
        assert!(is_safe_asset_path("js/app.mjs"));
        assert!(!is_safe_asset_path("../secrets"));
        assert!(!is_safe_asset_path("a/../b"));
        assert!(!is_safe_asset_path("a//b"));
        assert!(!is_safe_asset_path("./a"));
        assert!(!is_safe_asset_path(""));
    }

    #[test]
    fn content_types_cover_viewer_assets() {
        assert_eq!(content_type_for("index.html"), "text/html; charset=utf-8");
        assert_eq!(content_type_for("client.mjs"), "application/javascript");
        assert_eq!(content_type_for("style.css"), "text/css");
        assert_eq!(content_type_for("blob"), "application/octet-stream");
    }
}
