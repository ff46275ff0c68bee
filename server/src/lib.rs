//! # Game Server Library
//!
//! Authoritative server for the networked tile platformer. It owns the
//! canonical player table, runs the fixed-rate scoring and kill rules, and
//! relays every client's reported movement to the other clients.
//!
//! ## Core Responsibilities
//!
//! ### Session Management
//! Every accepted TCP stream becomes a client with a fresh identity. The
//! first frame a client ever receives is `Initialize` carrying that
//! identity, followed by a `SpawnPlayer` for every player in the game.
//!
//! ### Authoritative Rules
//! Position is client-reported and trusted: the server stores and relays it
//! without validation. Score, high score and deaths are decided here, 20
//! times per second, and broadcast only when they actually change.
//!
//! ## Architecture Design
//!
//! ### Single Owner Event Loop
//! One select loop owns the client table and the game state. Connection
//! read tasks, the accept task and the tick interval only send events into
//! that loop, so no state is ever shared between tasks.
//!
//! ### Length-Prefixed TCP Frames
//! Messages travel as `[length][type tag][payload]` frames over TCP (see
//! `shared::codec`). A client that goes quiet for 30 seconds is dropped.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! - Identity allocation and the live-client table
//! - Unicast, broadcast and broadcast-excluding sends
//!
//! ### Game Module (`game`)
//! - Player table, spawn and removal
//! - Per-tick heartbeat, score decay, cash-in, refill and kill rules
//!
//! ### Network Module (`network`)
//! - TCP accept loop and connection event handling
//! - Message handler registration and the fixed-rate tick
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//! use shared::map::MapData;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let map = MapData::load("assets/map.json")?;
//!     let server = Server::bind("0.0.0.0:8052", map, ServerConfig::default()).await?;
//!
//!     // Accepts clients and ticks at 20 Hz until Ctrl+C
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod network;
