//! UDP telemetry ingestion and player expiry.
//!
//! A single sequential task reads one datagram at a time and drives the whole
//! decode → resolve → encode → broadcast pipeline; registry mutations from
//! this path and from the expiry sweep are serialized by the registry lock.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use horizon_relay_players::PlayerRegistry;
use horizon_relay_telemetry::{VIEWER_MESSAGE_SIZE, decode_cardash, encode_viewer_message};
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

use crate::clients::ClientRegistry;

/// Largest datagram worth reading; anything longer than a CarDash packet is
/// rejected by the decoder anyway.
const MAX_DATAGRAM_SIZE: usize = 512;
/// How often stale players are swept out.
const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Wall-clock milliseconds since the Unix epoch.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
        .min(u128::from(u64::MAX)) as u64
}

/// Run one datagram through decode → resolve → encode.
///
/// Returns the viewer message on acceptance. Malformed datagrams and
/// out-of-order packets yield `None` with no observable output.
pub fn handle_datagram(
    datagram: &[u8],
    now_ms: u64,
    players: &mut PlayerRegistry,
) -> Option<[u8; VIEWER_MESSAGE_SIZE]> {
    let frame = match decode_cardash(datagram) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("dropping datagram: {e}");
            return None;
        }
    };

    let Some(resolved) = players.resolve(now_ms, &frame) else {
        trace!("dropping out-of-order datagram (timestamp {})", frame.timestamp_ms);
        return None;
    };

    Some(encode_viewer_message(resolved.id, resolved.hue, &frame))
}

/// Sequential ingestion loop: one datagram in, at most one broadcast out.
pub async fn run_ingest(
    socket: UdpSocket,
    players: Arc<Mutex<PlayerRegistry>>,
    clients: ClientRegistry,
) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    loop {
        match socket.recv(&mut buf).await {
            Ok(len) => {
                let now_ms = unix_millis();
                let message = {
                    let mut registry = players.lock();
                    handle_datagram(&buf[..len], now_ms, &mut registry)
                };
                if let Some(message) = message {
                    clients.broadcast(Bytes::copy_from_slice(&message));
                }
            }
            Err(e) => warn!("UDP receive error: {e}"),
        }
    }
}

/// Periodic expiry sweep; ids of removed players become reusable.
pub async fn run_expiry_sweep(players: Arc<Mutex<PlayerRegistry>>) {
    let mut tick = tokio::time::interval(EXPIRY_SWEEP_INTERVAL);
    loop {
        tick.tick().await;
        let removed = players.lock().sweep(unix_millis());
        if removed > 0 {
            debug!(removed, "expired inactive players");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_datagram_produces_no_message() {
        let mut registry = PlayerRegistry::new();
        assert!(handle_datagram(&[0u8; 10], 1_000_000, &mut registry).is_none());
        assert_eq!(registry.player_count(), 0);
    }

    #[test]
    fn unix_millis_is_plausible() {
        // 2020-01-01 in ms; mostly a guard against unit slips.
        assert!(unix_millis() > 1_577_836_800_000);
    }
}
