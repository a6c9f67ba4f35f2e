//! # Tank Arena Client Library
//!
//! Headless client for the tank arena server. It joins with a player name,
//! mirrors the authoritative world from the per-tick record stream and sends
//! one control command per received frame.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The client-side world mirror:
//! - Replace-or-insert of tanks, projectiles, powerups and walls by id
//! - Removal of entities the server reported dead or disconnected
//! - A short display window for beams, which the server reports only once
//!
//! ### Input Module (`input`)
//! Maps intent to commands:
//! - Held movement keys where the last pressed key wins
//! - Main fire while held, alt fire as a one-shot
//! - Turret aim as the normalized vector toward an aim point
//! - A scripted autopilot used by the binary
//!
//! ### Network Module (`network`)
//! The TCP connection: name handshake, line framing and command sending.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::input::InputManager;
//! use client::network::Client;
//! use shared::MoveDirection;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::connect("127.0.0.1:11000", "alice").await?;
//!     let mut input = InputManager::new();
//!     input.press(MoveDirection::Up);
//!
//!     loop {
//!         client.receive().await?;
//!         client.send_command(&input.command()).await?;
//!     }
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
