//! # Blocktown Server Library
//!
//! Authoritative server for a multiplayer voxel town shooter. It owns the
//! block terrain, every player and NPC, and all projectiles, and streams that
//! state to connected WebSocket clients at a fixed rate.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Player movement, NPC behaviour and ballistics all run here in fixed steps.
//! Clients only send intent (inputs, block edits, shots) and render whatever
//! the server broadcasts back.
//!
//! ### Session Management
//! Handles the lifecycle of WebSocket sessions:
//! - Connection establishment, player assignment and the initial world download
//! - Routing of inbound frames to the simulation
//! - Disconnection and idle-timeout cleanup
//!
//! ### State Broadcasting
//! Sends a snapshot of every player and NPC followed by the shots, deaths and
//! block edits that happened since the previous broadcast.
//!
//! ## Architecture Design
//!
//! ### Single Owner Event Loop
//! One task owns the `GameState`. Connection tasks forward frames over a
//! channel and the loop applies them between ticks, so a tick never observes
//! a half-applied input.
//!
//! ### Decoupled Tick and Broadcast Rates
//! Simulation runs on a fixed step (16 ms by default) while broadcasts are
//! throttled separately (50 ms by default).
//!
//! ## Module Organization
//!
//! - `blocks`: sparse voxel store with an implicit solid floor
//! - `worldgen`: seeded town generation and safe spawn search
//! - `physics`: axis-separated voxel collision, line of sight
//! - `entity`: server-side player state
//! - `combat`: projectiles and hit resolution
//! - `npc`: villager flocking and police cover/engage behaviour
//! - `threat`: decaying per-player aggro used for police targeting
//! - `events`: shots, deaths and block edits queued for broadcast
//! - `game`: the `GameState` tying the above together
//! - `gateway`: lenient decoding of client frames into simulation calls
//! - `client_manager`: session table and outbound queues
//! - `network`: listener, per-connection tasks and the main loop
//! - `config`, `error`: command-line configuration and error types
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         port: 8080,
//!         ..Default::default()
//!     };
//!     let mut server = Server::new(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod blocks;
pub mod client_manager;
pub mod combat;
pub mod config;
pub mod entity;
pub mod error;
pub mod events;
pub mod game;
pub mod gateway;
pub mod network;
pub mod npc;
pub mod physics;
pub mod threat;
pub mod worldgen;
