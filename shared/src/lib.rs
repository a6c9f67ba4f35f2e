//! Types shared by the tank arena server and its clients: geometry, the
//! entity model, gameplay constants and the line-based wire protocol.

pub mod entities;
pub mod protocol;
pub mod vector;

pub use entities::{Area, Beam, EntityId, Powerup, Projectile, Tank, Wall};
pub use protocol::{
    encode_line, read_line, ControlCommand, FireMode, Handshake, MoveDirection, ProtocolError,
    RecordKind, WireRecord,
};
pub use vector::Vector2D;

/// Distance a tank covers per tick while a movement key is held.
pub const TANK_SPEED: f64 = 5.0;
/// Side length of a tank's square footprint.
pub const TANK_SIZE: f64 = 60.0;
/// Thickness of a wall segment.
pub const WALL_SIZE: f64 = 50.0;
/// Distance a projectile covers per tick.
pub const PROJECTILE_SPEED: f64 = 25.0;
/// Radius of the circle a beam must cross to hit a tank.
pub const BEAM_HIT_RADIUS: f64 = 42.42;
/// Damage dealt by a beam; always lethal.
pub const BEAM_DAMAGE: i32 = 3;
/// Damage dealt by a projectile.
pub const PROJECTILE_DAMAGE: i32 = 1;
pub const MAX_HP: i32 = 3;
/// Longest player name a client may send.
pub const MAX_NAME_LENGTH: usize = 16;
/// Longest line either side accepts before dropping the connection.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;
/// Band at the world edge that triggers wraparound: half a tank plus one tick of travel.
pub const WRAP_MARGIN: f64 = TANK_SIZE / 2.0 + TANK_SPEED;

pub const DEFAULT_UNIVERSE_SIZE: u32 = 2000;
pub const DEFAULT_MS_PER_FRAME: u64 = 17;
pub const DEFAULT_FRAMES_PER_SHOT: u32 = 80;
pub const DEFAULT_RESPAWN_RATE: u32 = 300;
pub const DEFAULT_MAX_POWERUPS: usize = 3;
/// Upper bound (exclusive) of a powerup's randomized respawn delay, in ticks.
pub const DEFAULT_MAX_POWERUP_DELAY: u32 = 1650;
pub const DEFAULT_PORT: u16 = 11000;
