//! Socket-free end-to-end tests: raw 324-byte datagrams through the full
//! decode → resolve → encode pipeline.

use horizon_relay_players::PlayerRegistry;
use horizon_relay_server::ingest::handle_datagram;
use horizon_relay_telemetry::{CARDASH_FH4_SIZE, VIEWER_MESSAGE_SIZE};

const OFF_IS_RACE_ON: usize = 0;
const OFF_TIMESTAMP_MS: usize = 4;
const OFF_SPEED: usize = 256;
const OFF_ACCEL: usize = 315;
const OFF_BRAKE: usize = 316;
const OFF_HANDBRAKE: usize = 318;
const OFF_STEER: usize = 320;

fn datagram(timestamp_ms: u32, pedals: (u8, u8, u8), steer: u8) -> Vec<u8> {
    let mut data = vec![0u8; CARDASH_FH4_SIZE];
    data[OFF_IS_RACE_ON..OFF_IS_RACE_ON + 4].copy_from_slice(&1i32.to_le_bytes());
    data[OFF_TIMESTAMP_MS..OFF_TIMESTAMP_MS + 4].copy_from_slice(&timestamp_ms.to_le_bytes());
    data[OFF_SPEED..OFF_SPEED + 4].copy_from_slice(&42.0f32.to_le_bytes());
    data[OFF_ACCEL] = pedals.0;
    data[OFF_BRAKE] = pedals.1;
    data[OFF_HANDBRAKE] = pedals.2;
    data[OFF_STEER] = steer;
    data
}

fn message_id(message: &[u8; VIEWER_MESSAGE_SIZE]) -> u32 {
    u32::from_le_bytes([message[0], message[1], message[2], message[3]])
}

#[test]
fn calibration_then_normal_driving_keeps_id_and_hue() {
    let mut players = PlayerRegistry::new();
    let now = 1_700_000_000_000u64;

    // Calibration chord with steer 200: hue becomes 200 - 129 = 71.
    let first = datagram(30_000, (0xFF, 0xFF, 0xFF), 200);
    let message = handle_datagram(&first, now, &mut players).expect("first packet accepted");
    assert_eq!(message.len(), VIEWER_MESSAGE_SIZE);
    assert_eq!(message_id(&message), 0);
    assert_eq!(message[VIEWER_MESSAGE_SIZE - 1], 71);

    // 10ms later, same source: timestamp advanced by 10, pedals released.
    let second = datagram(30_010, (0, 0, 0), 64);
    let message = handle_datagram(&second, now + 10, &mut players).expect("second packet accepted");
    assert_eq!(message_id(&message), 0);
    assert_eq!(message[VIEWER_MESSAGE_SIZE - 1], 71, "hue unchanged");
}

#[test]
fn two_sources_get_distinct_ids() {
    let mut players = PlayerRegistry::new();
    let now = 1_700_000_000_000u64;

    // Two game instances whose clocks differ by well over the tolerance.
    let a = handle_datagram(&datagram(30_000, (0, 0, 0), 0), now, &mut players).unwrap();
    let b = handle_datagram(&datagram(600_000, (0, 0, 0), 0), now, &mut players).unwrap();
    assert_eq!(message_id(&a), 0);
    assert_eq!(message_id(&b), 1);

    // Interleaved follow-ups keep their identities.
    let a2 = handle_datagram(&datagram(30_016, (0, 0, 0), 0), now + 16, &mut players).unwrap();
    let b2 = handle_datagram(&datagram(600_016, (0, 0, 0), 0), now + 16, &mut players).unwrap();
    assert_eq!(message_id(&a2), 0);
    assert_eq!(message_id(&b2), 1);
}

#[test]
fn out_of_order_datagram_yields_no_message() {
    let mut players = PlayerRegistry::new();
    let now = 1_700_000_000_000u64;

    handle_datagram(&datagram(30_000, (0, 0, 0), 0), now, &mut players).unwrap();
    // Correlation key still within tolerance, embedded timestamp older.
    let stale = datagram(29_920, (0, 0, 0), 0);
    assert!(handle_datagram(&stale, now + 10, &mut players).is_none());
    assert_eq!(players.player_count(), 1);
}

#[test]
fn malformed_datagrams_are_silently_dropped() {
    let mut players = PlayerRegistry::new();
    let now = 1_700_000_000_000u64;

    assert!(handle_datagram(&[], now, &mut players).is_none());
    assert!(handle_datagram(&[0u8; 323], now, &mut players).is_none());
    assert!(handle_datagram(&[0u8; 325], now, &mut players).is_none());
    assert_eq!(players.player_count(), 0, "no state change for bad datagrams");
}

#[test]
fn speed_bytes_pass_through_verbatim() {
    let mut players = PlayerRegistry::new();
    let now = 1_700_000_000_000u64;

    let data = datagram(30_000, (0, 0, 0), 0);
    let message = handle_datagram(&data, now, &mut players).unwrap();
    assert_eq!(&message[24..28], &data[OFF_SPEED..OFF_SPEED + 4]);
    assert_eq!(&message[4..8], &data[OFF_IS_RACE_ON..OFF_IS_RACE_ON + 4]);
}
