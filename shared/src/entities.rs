//! World objects shared by the server simulation and the client mirror.
//!
//! Every entity serializes to exactly one wire record whose discriminant key
//! (`tank`, `proj`, `power`, `wall`, `beam`) carries its id. Simulation-only
//! bookkeeping (cooldowns, ammo, speed) is skipped on the wire.

use crate::vector::Vector2D;
use crate::{
    BEAM_DAMAGE, MAX_HP, PROJECTILE_SPEED, TANK_SIZE, TANK_SPEED, WALL_SIZE, WRAP_MARGIN,
};
use serde::{Deserialize, Serialize};

/// Stable integer identity of an entity within its own collection.
pub type EntityId = i32;

/// Axis-aligned rectangle used for every overlap test in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Area {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Area {
    /// Builds the box of the given size centred on `center`.
    pub fn around(center: Vector2D, width: f64, height: f64) -> Self {
        Self {
            min_x: center.x - width / 2.0,
            max_x: center.x + width / 2.0,
            min_y: center.y - height / 2.0,
            max_y: center.y + height / 2.0,
        }
    }

    /// Grows the box by `amount` on every side.
    pub fn expanded(&self, amount: f64) -> Self {
        Self {
            min_x: self.min_x - amount,
            max_x: self.max_x + amount,
            min_y: self.min_y - amount,
            max_y: self.max_y + amount,
        }
    }

    /// Strict point-in-rectangle test: a point on the boundary is outside.
    pub fn contains(&self, point: Vector2D) -> bool {
        point.x > self.min_x && point.x < self.max_x && point.y > self.min_y && point.y < self.max_y
    }
}

/// A player-controlled tank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tank {
    #[serde(rename = "tank")]
    pub id: EntityId,
    pub name: String,
    pub loc: Vector2D,
    pub bdir: Vector2D,
    pub tdir: Vector2D,
    pub score: u32,
    pub hp: i32,
    pub died: bool,
    pub dc: bool,
    pub join: bool,

    #[serde(skip)]
    speed: f64,
    #[serde(skip)]
    fire_cooldown: u32,
    #[serde(skip)]
    respawn_cooldown: u32,
    #[serde(skip)]
    alt_ammo: u32,
    #[serde(skip)]
    frozen: bool,
}

impl Tank {
    pub fn new(id: EntityId, name: impl Into<String>, loc: Vector2D) -> Self {
        Self {
            id,
            name: name.into(),
            loc,
            bdir: Vector2D::UP,
            tdir: Vector2D::UP,
            score: 0,
            hp: MAX_HP,
            died: false,
            dc: false,
            join: true,
            speed: 0.0,
            fire_cooldown: 0,
            respawn_cooldown: 0,
            alt_ammo: 0,
            frozen: false,
        }
    }

    /// Current speed in world units per tick (0 when idle).
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Starts moving along `dir` at tank speed.
    pub fn drive(&mut self, dir: Vector2D) {
        self.bdir = dir;
        self.speed = TANK_SPEED;
    }

    /// Stops movement; the body keeps facing its last heading.
    pub fn halt(&mut self) {
        self.speed = 0.0;
    }

    /// Replaces the aim heading. A zero vector leaves the aim unchanged.
    pub fn aim(&mut self, tdir: Vector2D) {
        if !tdir.is_zero() {
            self.tdir = tdir.normalize();
        }
    }

    /// Where the tank would be after moving for one tick.
    pub fn next_location(&self) -> Vector2D {
        self.loc + self.bdir * self.speed
    }

    /// Where the tank ends up after one tick, wraparound included.
    pub fn destination(&self, world_size: f64) -> Vector2D {
        let mut loc = self.next_location();
        let limit = world_size / 2.0 - WRAP_MARGIN;
        if loc.y.abs() > limit {
            loc.y = (-loc.y).clamp(-limit, limit);
        }
        if loc.x.abs() > limit {
            loc.x = (-loc.x).clamp(-limit, limit);
        }
        loc
    }

    /// Moves one tick along the body heading, wrapping at the world edges.
    pub fn advance(&mut self, world_size: f64) {
        self.loc = self.destination(world_size);
    }

    /// Teleports the tank without any collision checks.
    pub fn relocate(&mut self, loc: Vector2D) {
        self.loc = loc;
    }

    /// The 60x60 body box used for projectile and powerup overlap.
    pub fn area(&self) -> Area {
        Area::around(self.loc, TANK_SIZE, TANK_SIZE)
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn can_shoot(&self) -> bool {
        self.fire_cooldown == 0
    }

    pub fn fire_cooldown(&self) -> u32 {
        self.fire_cooldown
    }

    pub fn respawn_cooldown(&self) -> u32 {
        self.respawn_cooldown
    }

    pub fn can_respawn(&self) -> bool {
        self.respawn_cooldown == 0
    }

    pub fn alt_ammo(&self) -> u32 {
        self.alt_ammo
    }

    /// Starts the main-weapon cooldown.
    pub fn fired(&mut self, cooldown: u32) {
        self.fire_cooldown = cooldown;
    }

    /// Spends one alt-fire charge. Returns false when the tank has none.
    pub fn use_alt(&mut self) -> bool {
        if self.alt_ammo == 0 {
            return false;
        }
        self.alt_ammo -= 1;
        true
    }

    pub fn pick_up_powerup(&mut self) {
        self.alt_ammo += 1;
    }

    pub fn decrement_fire_cooldown(&mut self) {
        self.fire_cooldown = self.fire_cooldown.saturating_sub(1);
    }

    pub fn decrement_respawn_cooldown(&mut self) {
        self.respawn_cooldown = self.respawn_cooldown.saturating_sub(1);
    }

    /// Applies damage, never letting hp drop below zero.
    pub fn take_damage(&mut self, amount: i32) {
        self.hp = (self.hp - amount).max(0);
    }

    /// Applies a beam hit, which is always lethal.
    pub fn take_beam_hit(&mut self) {
        self.take_damage(BEAM_DAMAGE);
    }

    /// Enters the dead state: frozen until `respawn_delay` ticks have passed.
    pub fn kill(&mut self, respawn_delay: u32) {
        self.hp = 0;
        self.died = true;
        self.frozen = true;
        self.speed = 0.0;
        self.respawn_cooldown = respawn_delay;
    }

    pub fn award_kill(&mut self) {
        self.score += 1;
    }

    pub fn needs_respawn(&self) -> bool {
        self.can_respawn() && self.hp <= 0 && !self.dc
    }

    /// Restores vitality at a fresh location.
    pub fn respawn(&mut self, loc: Vector2D) {
        self.loc = loc;
        self.hp = MAX_HP;
        self.died = false;
        self.frozen = false;
        self.alt_ammo = 0;
    }

    /// Converts the tank into its disconnected state; it will never respawn.
    pub fn disconnect(&mut self) {
        self.hp = 0;
        self.died = true;
        self.dc = true;
        self.frozen = true;
        self.speed = 0.0;
    }

    /// Clears the one-tick death display flag. Disconnected tanks keep it
    /// until they are reported and dropped.
    pub fn begin_tick(&mut self) {
        if !self.dc {
            self.died = false;
        }
    }
}

/// A main-weapon shell travelling in a straight line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    #[serde(rename = "proj")]
    pub id: EntityId,
    pub loc: Vector2D,
    pub dir: Vector2D,
    pub died: bool,
    pub owner: EntityId,
}

impl Projectile {
    pub fn new(id: EntityId, loc: Vector2D, dir: Vector2D, owner: EntityId) -> Self {
        Self {
            id,
            loc,
            dir: dir.normalize(),
            died: false,
            owner,
        }
    }

    pub fn advance(&mut self) {
        self.loc = self.loc + self.dir * PROJECTILE_SPEED;
    }

    pub fn is_out_of_bounds(&self, world_size: f64) -> bool {
        let half = world_size / 2.0;
        self.loc.x > half || self.loc.x < -half || self.loc.y > half || self.loc.y < -half
    }
}

/// An alt-fire charge lying on the map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Powerup {
    #[serde(rename = "power")]
    pub id: EntityId,
    pub loc: Vector2D,
    pub died: bool,
}

impl Powerup {
    pub fn new(id: EntityId, loc: Vector2D) -> Self {
        Self {
            id,
            loc,
            died: false,
        }
    }
}

/// A static axis-aligned wall segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    #[serde(rename = "wall")]
    pub id: EntityId,
    pub p1: Vector2D,
    pub p2: Vector2D,
}

impl Wall {
    pub fn new(id: EntityId, p1: Vector2D, p2: Vector2D) -> Self {
        Self { id, p1, p2 }
    }

    pub fn is_axis_aligned(&self) -> bool {
        self.p1.x == self.p2.x || self.p1.y == self.p2.y
    }

    /// The solid box of the segment, `WALL_SIZE` thick.
    pub fn area(&self) -> Area {
        let half = WALL_SIZE / 2.0;
        Area {
            min_x: self.p1.x.min(self.p2.x) - half,
            max_x: self.p1.x.max(self.p2.x) + half,
            min_y: self.p1.y.min(self.p2.y) - half,
            max_y: self.p1.y.max(self.p2.y) + half,
        }
    }

    /// The solid box grown by half a tank, so testing a tank's centre point
    /// against it is equivalent to testing the whole body.
    pub fn buffered_area(&self) -> Area {
        self.area().expanded(TANK_SIZE / 2.0)
    }
}

/// An instant hit-scan shot. Lives for the tick it was fired in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beam {
    #[serde(rename = "beam")]
    pub id: EntityId,
    pub org: Vector2D,
    pub dir: Vector2D,
    pub owner: EntityId,
}

impl Beam {
    pub fn new(id: EntityId, org: Vector2D, dir: Vector2D, owner: EntityId) -> Self {
        Self {
            id,
            org,
            dir,
            owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_area_contains_is_strict() {
        let area = Area::around(Vector2D::ZERO, 10.0, 10.0);
        assert!(area.contains(Vector2D::new(0.0, 0.0)));
        assert!(area.contains(Vector2D::new(4.99, -4.99)));
        assert!(!area.contains(Vector2D::new(5.0, 0.0)));
        assert!(!area.contains(Vector2D::new(0.0, -5.0)));
    }

    #[test]
    fn test_tank_creation() {
        let tank = Tank::new(7, "alice", Vector2D::new(10.0, 20.0));
        assert_eq!(tank.id, 7);
        assert_eq!(tank.hp, MAX_HP);
        assert_eq!(tank.score, 0);
        assert!(tank.join);
        assert!(!tank.died);
        assert!(!tank.is_frozen());
        assert!(tank.can_shoot());
        assert_eq!(tank.alt_ammo(), 0);
    }

    #[test]
    fn test_tank_damage_clamps_at_zero() {
        let mut tank = Tank::new(0, "a", Vector2D::ZERO);
        tank.take_damage(1);
        assert_eq!(tank.hp, 2);
        tank.take_beam_hit();
        assert_eq!(tank.hp, 0);
    }

    #[test]
    fn test_tank_kill_and_respawn_cycle() {
        let mut tank = Tank::new(0, "a", Vector2D::ZERO);
        tank.pick_up_powerup();
        tank.kill(2);

        assert!(tank.died);
        assert!(tank.is_frozen());
        assert!(!tank.needs_respawn());

        tank.decrement_respawn_cooldown();
        tank.decrement_respawn_cooldown();
        tank.decrement_respawn_cooldown();
        assert_eq!(tank.respawn_cooldown(), 0);
        assert!(tank.needs_respawn());

        tank.respawn(Vector2D::new(5.0, 5.0));
        assert_eq!(tank.hp, MAX_HP);
        assert!(!tank.is_frozen());
        assert!(!tank.died);
        assert_eq!(tank.alt_ammo(), 0);
        assert_eq!(tank.loc, Vector2D::new(5.0, 5.0));
    }

    #[test]
    fn test_disconnected_tank_never_needs_respawn() {
        let mut tank = Tank::new(0, "a", Vector2D::ZERO);
        tank.disconnect();
        assert_eq!(tank.hp, 0);
        assert!(tank.dc);
        assert!(!tank.needs_respawn());

        tank.begin_tick();
        assert!(tank.died);
    }

    #[test]
    fn test_tank_wraps_vertically() {
        let mut tank = Tank::new(0, "a", Vector2D::new(0.0, 460.0));
        tank.drive(Vector2D::DOWN);
        tank.advance(1000.0);
        tank.advance(1000.0);
        assert!(tank.loc.y < 0.0);

        // A stationary tank right after the wrap stays put.
        tank.halt();
        let wrapped = tank.loc;
        tank.advance(1000.0);
        assert_eq!(tank.loc, wrapped);
    }

    #[test]
    fn test_alt_ammo() {
        let mut tank = Tank::new(0, "a", Vector2D::ZERO);
        assert!(!tank.use_alt());
        tank.pick_up_powerup();
        assert!(tank.use_alt());
        assert_eq!(tank.alt_ammo(), 0);
    }

    #[test]
    fn test_projectile_advance() {
        let mut proj = Projectile::new(0, Vector2D::ZERO, Vector2D::new(0.0, 2.0), 1);
        proj.advance();
        assert_approx_eq!(proj.loc.y, PROJECTILE_SPEED, 1e-9);
        assert!(!proj.is_out_of_bounds(100.0));
        proj.advance();
        proj.advance();
        assert!(proj.is_out_of_bounds(100.0));
    }

    #[test]
    fn test_wall_areas() {
        let wall = Wall::new(0, Vector2D::new(-100.0, 0.0), Vector2D::new(100.0, 0.0));
        let area = wall.area();
        assert_eq!(area.min_x, -125.0);
        assert_eq!(area.max_x, 125.0);
        assert_eq!(area.min_y, -25.0);
        assert_eq!(area.max_y, 25.0);

        let buffered = wall.buffered_area();
        assert_eq!(buffered.min_x, -155.0);
        assert_eq!(buffered.max_y, 55.0);
        assert!(wall.is_axis_aligned());
        assert!(!Wall::new(1, Vector2D::ZERO, Vector2D::new(1.0, 1.0)).is_axis_aligned());
    }

    #[test]
    fn test_tank_wire_fields() {
        let tank = Tank::new(3, "bob", Vector2D::ZERO);
        let value = serde_json::to_value(&tank).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "tank", "name", "loc", "bdir", "tdir", "score", "hp", "died", "dc", "join",
        ] {
            assert!(object.contains_key(key), "missing {}", key);
        }
        assert!(!object.contains_key("alt_ammo"));
        assert!(!object.contains_key("frozen"));
    }
}
