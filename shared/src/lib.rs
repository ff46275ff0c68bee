//! Wire protocol, connection plumbing and simulation primitives shared by the
//! tile-platformer server and client.

use std::time::Duration;

pub mod codec;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod framing;
pub mod map;
pub mod message;
pub mod player;
pub mod timestep;

pub use codec::{decode_frame, encode_frame, BinaryReader, BinaryWriter};
pub use connection::{Connection, ConnectionEvent, ConnectionState, DisconnectReason};
pub use dispatch::Dispatcher;
pub use error::ProtocolError;
pub use framing::FrameAssembler;
pub use map::{MapData, MapError, TileData, TileEffect};
pub use message::{Message, MessageType, Payload};
pub use player::{Animation, Direction, PlayerState, PLAYER_HITBOX};
pub use timestep::FixedTimestep;

/// Server-assigned client identity. Never reused within a server's lifetime.
pub type ClientId = i32;

/// Simulation steps per second.
pub const TICK_RATE: u32 = 20;

/// A connection with no inbound bytes for this long is closed.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);
pub const SCORE_DECAY_INTERVAL: Duration = Duration::from_secs(1);
pub const SCORE_DECAY_AMOUNT: i32 = 10;

/// Score granted when a player with zero score stands on a start tile.
pub const STARTING_SCORE: i32 = 1000;

/// Names are truncated to this many characters.
pub const MAX_NAME_LENGTH: usize = 16;

/// Largest accepted length prefix (type tag plus payload). Names arrive
/// untruncated, so this is far above any frame the game itself produces.
pub const MAX_FRAME_LENGTH: usize = 1 << 20;

/// Outbound frames a connection may have queued before it is dropped as a
/// slow consumer.
pub const MAX_QUEUED_FRAMES: usize = 4096;

pub const DEFAULT_PORT: u16 = 8052;
pub const DEFAULT_NAME: &str = "Player";
