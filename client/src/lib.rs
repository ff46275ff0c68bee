//! # Game Client Library
//!
//! Client side of the tile platformer. The local player is simulated on the
//! client and its pose is reported to the server at the tick rate; everything
//! else (other players, scores, respawns) arrives from the server.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The client's copy of the player table:
//! - Applies server messages and produces the replies they call for
//!   (`UpdateName` after `Initialize`, `Heartbeat` echoes)
//! - Treats a `MovePlayer` for the local player as a respawn
//! - Eases remote players towards their last reported position
//!
//! ### Movement Module (`movement`)
//! Local player physics against the tile map: running, gravity, variable
//! jump height and jump tiles.
//!
//! ### Network Module (`network`)
//! A TCP link to the server, driven by a background tokio runtime so the
//! render loop can poll it without blocking.
//!
//! ### Input and Rendering (`input`, `rendering`)
//! Keyboard sampling and drawing through macroquad.
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::game::ClientWorld;
//! use client::movement::MoveInput;
//! use client::network::NetworkClient;
//! use shared::map::MapData;
//! use shared::TICK_RATE;
//!
//! # fn main() -> Result<(), client::error::ClientError> {
//! let map = MapData::load("assets/map.json")?;
//! let mut world = ClientWorld::new(map, "Alice", TICK_RATE);
//! let mut network = NetworkClient::connect("127.0.0.1:8052")?;
//!
//! loop {
//!     for message in network.poll() {
//!         for reply in world.handle_message(message)? {
//!             network.send(&reply);
//!         }
//!     }
//!     for report in world.update(MoveInput::default(), 1.0 / 60.0) {
//!         network.send(&report);
//!     }
//!     if !network.is_connected() {
//!         break;
//!     }
//! }
//! network.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod game;
pub mod input;
pub mod movement;
pub mod network;
pub mod rendering;
