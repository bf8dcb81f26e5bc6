//! Player correlation registry for Horizon Relay.
//!
//! The FH4 "Data Out" stream carries no session identifier: several logical
//! players (split screen, multiple game instances) can share one UDP port.
//! The registry infers ownership from timing alone. Each datagram's
//! correlation key is `receive_time_ms - embedded_timestamp_ms`, an estimate
//! of the source's clock offset; a player is the set of datagrams whose keys
//! agree within a fixed tolerance.
//!
//! Time is caller-supplied (`now_ms`), keeping the registry pure and the
//! liveness rules directly testable. The owning server is responsible for
//! serializing access (see `horizon-relay-server`) and for calling
//! [`PlayerRegistry::sweep`] periodically.

use horizon_relay_telemetry::CarDashFrame;
use rand::Rng;

/// A datagram matches a player when its key is strictly within this many
/// milliseconds of the player's stored key.
pub const CORRELATION_TOLERANCE_MS: i64 = 100;
/// A player with no accepted datagram for this long is removed.
pub const PLAYER_EXPIRY_MS: u64 = 5000;
/// Hues occupy `[0, 254]`: steer byte 128 never occurs, so the 255-value
/// steer range collapses onto 255 distinct hues.
pub const HUE_MAX: u8 = 254;

/// A tracked logical player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Player {
    /// Smallest id unused at creation time; reusable after expiry.
    pub id: u32,
    /// Clock-offset estimate fixed at creation; the player's identity.
    pub correlation_key: i64,
    /// Embedded timestamp of the most recently accepted datagram.
    pub last_timestamp_ms: u32,
    /// Display hue in `[0, 254]`.
    pub hue: u8,
    /// Wall-clock (ms) of the last accepted datagram; drives expiry.
    pub last_seen_ms: u64,
}

/// Outcome of accepting a datagram: the identity the encoder needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub id: u32,
    pub hue: u8,
}

/// Remap the raw steer byte onto a hue.
///
/// Steer is 129..=255 for left and 0..=127 for right (128 does not occur in
/// practice). Flipping and joining the two halves makes the physical steering
/// extremes adjacent colors: a continuous cycle over `[0, 254]`.
pub fn hue_from_steer(steer: u8) -> u8 {
    if steer > 128 { steer - 129 } else { steer + 127 }
}

/// The set of currently-tracked players, in creation order.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: Vec<Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the player a datagram belongs to, updating registry state.
    ///
    /// Scans live players in creation order for the first whose stored key is
    /// within [`CORRELATION_TOLERANCE_MS`] of the datagram's key. No match
    /// creates a player (smallest free id, random hue) and accepts
    /// unconditionally. A match rejects the datagram (`None`, no state
    /// change) when its embedded timestamp is older than the player's last
    /// accepted one. Acceptance refreshes liveness, applies the hue
    /// calibration chord, and returns the identity for encoding.
    pub fn resolve(&mut self, now_ms: u64, frame: &CarDashFrame) -> Option<Resolved> {
        let key = now_ms as i64 - i64::from(frame.timestamp_ms);

        let index = match self
            .players
            .iter()
            .position(|p| (p.correlation_key - key).abs() < CORRELATION_TOLERANCE_MS)
        {
            Some(index) => {
                let player = self.players.get(index)?;
                if frame.timestamp_ms < player.last_timestamp_ms {
                    // Out-of-order or duplicate datagram.
                    return None;
                }
                index
            }
            None => {
                self.players.push(Player {
                    id: self.smallest_free_id(),
                    correlation_key: key,
                    last_timestamp_ms: 0,
                    hue: rand::thread_rng().gen_range(0..HUE_MAX),
                    last_seen_ms: 0,
                });
                self.players.len() - 1
            }
        };

        let player = self.players.get_mut(index)?;
        player.last_seen_ms = now_ms;
        player.last_timestamp_ms = frame.timestamp_ms;

        // Full throttle + full brake + full handbrake is a calibration chord
        // that never occurs in normal driving: the steer byte selects a hue.
        if frame.accelerator == u8::MAX && frame.brake == u8::MAX && frame.handbrake == u8::MAX {
            player.hue = hue_from_steer(frame.steer);
        }

        Some(Resolved {
            id: player.id,
            hue: player.hue,
        })
    }

    /// Remove every player whose last accepted datagram is at least
    /// [`PLAYER_EXPIRY_MS`] old. Returns the number removed; their ids
    /// become reusable.
    pub fn sweep(&mut self, now_ms: u64) -> usize {
        let before = self.players.len();
        self.players
            .retain(|p| now_ms.saturating_sub(p.last_seen_ms) < PLAYER_EXPIRY_MS);
        before - self.players.len()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Live players in creation order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    fn smallest_free_id(&self) -> u32 {
        let mut used: Vec<u32> = self.players.iter().map(|p| p.id).collect();
        used.sort_unstable();
        let mut id = 0u32;
        for u in used {
            if u == id {
                id += 1;
            } else if u > id {
                break;
            }
        }
        id
    }
}
