//! Forza Horizon 4 telemetry codec for Horizon Relay.
//!
//! Decodes the 324-byte FH4 "Data Out" CarDash datagram into the handful of
//! fields the relay forwards, and encodes the fixed 29-byte viewer wire
//! message. All multi-byte fields are little-endian at fixed offsets.
//!
//! Fields that are forwarded without interpretation (position, yaw, speed,
//! race flag) are carried as their raw little-endian bytes so encoding never
//! round-trips floats through the host representation. Accessor methods
//! expose the decoded values where a reader wants them.

use thiserror::Error;

/// FH4 CarDash datagram: the 311-byte FM7 CarDash layout plus 13 trailing
/// bytes of Horizon-specific data, 324 bytes total.
pub const CARDASH_FH4_SIZE: usize = 324;
/// Viewer message: id (4) + race flag (4) + position x/y/z (12) + yaw (4) +
/// speed (4) + hue (1).
pub const VIEWER_MESSAGE_SIZE: usize = 29;

// ── CarDash byte offsets ─────────────────────────────────────────────────────
const OFF_IS_RACE_ON: usize = 0; // i32
const OFF_TIMESTAMP_MS: usize = 4; // u32, ms since a source-local epoch
const OFF_YAW: usize = 56; // f32
const OFF_POS_X: usize = 244; // f32
const OFF_POS_Y: usize = 248; // f32
const OFF_POS_Z: usize = 252; // f32
const OFF_SPEED: usize = 256; // f32 m/s
const OFF_ACCEL: usize = 315; // u8
const OFF_BRAKE: usize = 316; // u8
const OFF_HANDBRAKE: usize = 318; // u8
const OFF_STEER: usize = 320; // u8 (129-255 left, 0-127 right, 128 unused)

/// Decode failure for an inbound datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected FH4 datagram length: expected {CARDASH_FH4_SIZE}, got {0}")]
    UnexpectedLength(usize),
}

/// The decoded subset of an FH4 CarDash datagram.
///
/// `timestamp_ms` and the pedal/steer bytes drive player correlation; the
/// `[u8; 4]` fields are raw little-endian pass-through for the viewer message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarDashFrame {
    pub is_race_on: [u8; 4],
    pub timestamp_ms: u32,
    pub yaw: [u8; 4],
    pub position_x: [u8; 4],
    pub position_y: [u8; 4],
    pub position_z: [u8; 4],
    pub speed: [u8; 4],
    pub accelerator: u8,
    pub brake: u8,
    pub handbrake: u8,
    pub steer: u8,
}

impl CarDashFrame {
    pub fn is_race_on(&self) -> bool {
        i32::from_le_bytes(self.is_race_on) != 0
    }

    pub fn yaw(&self) -> f32 {
        f32::from_le_bytes(self.yaw)
    }

    pub fn position(&self) -> (f32, f32, f32) {
        (
            f32::from_le_bytes(self.position_x),
            f32::from_le_bytes(self.position_y),
            f32::from_le_bytes(self.position_z),
        )
    }

    pub fn speed_mps(&self) -> f32 {
        f32::from_le_bytes(self.speed)
    }
}

/// Decode a single FH4 CarDash datagram.
///
/// # Errors
/// Returns [`DecodeError::UnexpectedLength`] for any buffer that is not
/// exactly [`CARDASH_FH4_SIZE`] bytes; truncated or oversized datagrams carry
/// no usable frame.
pub fn decode_cardash(data: &[u8]) -> Result<CarDashFrame, DecodeError> {
    if data.len() != CARDASH_FH4_SIZE {
        return Err(DecodeError::UnexpectedLength(data.len()));
    }

    Ok(CarDashFrame {
        is_race_on: read_bytes4(data, OFF_IS_RACE_ON).unwrap_or([0; 4]),
        timestamp_ms: read_u32_le(data, OFF_TIMESTAMP_MS).unwrap_or(0),
        yaw: read_bytes4(data, OFF_YAW).unwrap_or([0; 4]),
        position_x: read_bytes4(data, OFF_POS_X).unwrap_or([0; 4]),
        position_y: read_bytes4(data, OFF_POS_Y).unwrap_or([0; 4]),
        position_z: read_bytes4(data, OFF_POS_Z).unwrap_or([0; 4]),
        speed: read_bytes4(data, OFF_SPEED).unwrap_or([0; 4]),
        accelerator: data.get(OFF_ACCEL).copied().unwrap_or(0),
        brake: data.get(OFF_BRAKE).copied().unwrap_or(0),
        handbrake: data.get(OFF_HANDBRAKE).copied().unwrap_or(0),
        steer: data.get(OFF_STEER).copied().unwrap_or(0),
    })
}

/// Encode the 29-byte viewer message for a resolved player.
///
/// Layout, all little-endian: player id, race flag, position x/y/z, yaw,
/// speed, trailing hue byte. Pure transform; the pass-through fields are the
/// datagram's own bytes.
pub fn encode_viewer_message(id: u32, hue: u8, frame: &CarDashFrame) -> [u8; VIEWER_MESSAGE_SIZE] {
    let mut message = [0u8; VIEWER_MESSAGE_SIZE];
    message[0..4].copy_from_slice(&id.to_le_bytes());
    message[4..8].copy_from_slice(&frame.is_race_on);
    message[8..12].copy_from_slice(&frame.position_x);
    message[12..16].copy_from_slice(&frame.position_y);
    message[16..20].copy_from_slice(&frame.position_z);
    message[20..24].copy_from_slice(&frame.yaw);
    message[24..28].copy_from_slice(&frame.speed);
    message[28] = hue;
    message
}

fn read_bytes4(data: &[u8], offset: usize) -> Option<[u8; 4]> {
    data.get(offset..offset + 4).and_then(|b| b.try_into().ok())
}

fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    read_bytes4(data, offset).map(u32::from_le_bytes)
}
