//! # Tank Arena Server Library
//!
//! Authoritative server for a top-down multiplayer tank arena. The server
//! owns the only real copy of the world; clients send intents and receive
//! the resulting state once per tick.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Tanks drive in four directions, fire shells on a cooldown, pick up
//! powerups that charge a one-shot hit-scan beam, die, and respawn at
//! wall-free points after a delay. All of this happens in [`world::World`],
//! which is the sole mutator of entity state.
//!
//! ### Session Handling
//! A new connection names itself with its first line, receives its player
//! id, the world size and the wall layout, and from then on streams
//! newline-terminated JSON commands. Only the latest command per player is
//! kept between ticks.
//!
//! ### State Broadcasting
//! After every tick the server sends one JSON record per tank, projectile,
//! powerup and beam to every client. Entities that died or disconnected are
//! reported exactly once and then purged.
//!
//! ## Architecture
//!
//! Connection tasks never lock world state. They forward joins, raw command
//! lines and disconnects over a channel to the single tick loop, which owns
//! the [`session::Session`] outright.
//!
//! ## Module Organization
//!
//! - `config`: settings file loading and validation
//! - `physics`: ray-circle test, wall overlap and spawn sampling
//! - `world`: the per-tick simulation
//! - `client_manager`: joined connections and the latest-command table
//! - `session`: join handshake, command ingestion, broadcast and purge
//! - `network`: TCP accept loop and per-connection reader/writer tasks
//! - `game`: the fixed-rate tick scheduler
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::Settings;
//! use server::game::GameLoop;
//! use server::network::Server;
//! use server::session::Session;
//! use server::world::World;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::default();
//!     let (server_tx, server_rx) = mpsc::unbounded_channel();
//!
//!     let server = Server::bind("127.0.0.1:11000", server_tx).await?;
//!     tokio::spawn(server.run());
//!
//!     let session = Session::new(World::new(&settings));
//!     GameLoop::new(session, server_rx, settings.tick_duration())
//!         .run()
//!         .await;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod game;
pub mod network;
pub mod physics;
pub mod session;
pub mod world;
