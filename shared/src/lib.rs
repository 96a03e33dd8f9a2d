//! Types and constants shared by the tick server and the interpolating client

pub mod envelope;
pub mod math;
pub mod model;

pub use envelope::{
    CellUpdate, Chunk, ChunkId, ItemStack, PositionFix, RosterEntry, SlotChange, WorldDelta,
    WorldUpdate,
};
pub use math::{interpolate_direction, lerp, wrap_angle, Vec2};
pub use model::{
    DynamicFields, EntityUpdate, FieldValue, Snapshot, StaticFields, Timestamped, DIRECTION_KEY,
};

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub const PROTOCOL_VERSION: u32 = 1;

/// Rendering lag the client deliberately keeps behind the server
pub const RENDER_DELAY_MS: i64 = 100;
/// Smoothed offset error that triggers a clock resync
pub const SERVER_RESYNC_THRESHOLD_MS: i64 = 30;
/// Offset samples averaged per resync check
pub const CLOCK_SAMPLE_WINDOW: u32 = 10;
/// Silence longer than this many render delays flags the connection as lost
pub const CONNECTION_LOSS_FACTOR: i64 = 2;

pub const TICK_RATE: u32 = 20;

pub const PLAYER_SPEED: f32 = 200.0;
pub const PLAYER_RADIUS: f32 = 16.0;
pub const ENTITY_SPEED: f32 = 60.0;
pub const PICKUP_RADIUS: f32 = 10.0;

pub const CELL_SIZE: f32 = 32.0;
pub const CHUNK_SIZE: i32 = 8;
pub const WORLD_CHUNKS: i32 = 8;
pub const WORLD_SIZE: f32 = CELL_SIZE * (CHUNK_SIZE * WORLD_CHUNKS) as f32;

/// Largest datagram either side will try to decode
pub const MAX_PACKET_SIZE: usize = 65_507;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
        username: String,
    },
    Input {
        sequence: u32,
        move_x: f32,
        move_y: f32,
        direction: f32,
    },
    Click {
        x: f32,
        y: f32,
    },
    Disconnect,

    Connected {
        client_id: u32,
    },
    WorldUpdate(Box<WorldUpdate>),
    Disconnected {
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode packet: {0}")]
    Encode(#[source] bincode::Error),
    #[error("failed to decode packet: {0}")]
    Decode(#[source] bincode::Error),
    #[error("packet of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: usize },
}

pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    let data = bincode::serialize(packet).map_err(ProtocolError::Encode)?;
    if data.len() > MAX_PACKET_SIZE {
        return Err(ProtocolError::TooLarge {
            len: data.len(),
            max: MAX_PACKET_SIZE,
        });
    }
    Ok(data)
}

pub fn decode_packet(data: &[u8]) -> Result<Packet, ProtocolError> {
    bincode::deserialize(data).map_err(ProtocolError::Decode)
}

/// Wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_serialization_connect() {
        let packet = Packet::Connect {
            client_version: 42,
            username: "ada".to_string(),
        };
        let data = encode_packet(&packet).unwrap();

        match decode_packet(&data).unwrap() {
            Packet::Connect {
                client_version,
                username,
            } => {
                assert_eq!(client_version, 42);
                assert_eq!(username, "ada");
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_world_update() {
        let mut update = WorldUpdate::new(
            123_456,
            EntityUpdate::new(1)
                .with_static("username", "ada")
                .with_dynamic("x", 10.0)
                .with_dynamic(DIRECTION_KEY, -2.5),
        );
        update.others.push(EntityUpdate::new(2).with_dynamic("x", 3.0));
        update.world = Some(WorldDelta {
            unloaded: vec![(0, 1)],
            loaded: vec![Chunk {
                id: (2, 2),
                cells: vec![0; 64],
            }],
            cells: vec![CellUpdate { x: 3, y: 4, cell: 1 }],
        });
        update.fixes.push(PositionFix::Push { x: 1.0, y: -1.0 });
        update.recipes = Some(vec!["torch".to_string()]);
        update.tps = 19.5;

        let data = encode_packet(&Packet::WorldUpdate(Box::new(update.clone()))).unwrap();
        match decode_packet(&data).unwrap() {
            Packet::WorldUpdate(decoded) => assert_eq!(*decoded, update),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_decode_garbage_is_an_error() {
        let result = decode_packet(&[0xff, 0xff, 0xff, 0xff, 0x01]);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_now_millis_advances() {
        let first = now_millis();
        std::thread::sleep(Duration::from_millis(2));
        assert!(now_millis() > first);
    }
}
