//! Client-side mirror of the server world
//!
//! The mirror never simulates anything. It replaces records by id as they
//! arrive and forgets entities once the server has reported them gone.

use log::debug;
use shared::{Beam, EntityId, Powerup, Projectile, Tank, Wall, WireRecord};
use std::collections::BTreeMap;

/// Frames a beam stays visible after the server reported it.
pub const BEAM_DISPLAY_FRAMES: u32 = 30;

/// A beam together with the frames it has left on screen.
#[derive(Debug, Clone)]
pub struct DisplayedBeam {
    pub beam: Beam,
    pub frames_left: u32,
}

/// Notable transitions seen while applying records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEvent {
    TankJoined(EntityId),
    TankDied(EntityId),
    TankLeft(EntityId),
    BeamFired { owner: EntityId },
}

#[derive(Debug, Clone)]
pub struct ClientWorld {
    pub player_id: EntityId,
    pub world_size: u32,
    pub tanks: BTreeMap<EntityId, Tank>,
    pub projectiles: BTreeMap<EntityId, Projectile>,
    pub powerups: BTreeMap<EntityId, Powerup>,
    pub walls: BTreeMap<EntityId, Wall>,
    pub beams: Vec<DisplayedBeam>,
    pub frames: u64,
}

impl ClientWorld {
    pub fn new(player_id: EntityId, world_size: u32) -> Self {
        Self {
            player_id,
            world_size,
            tanks: BTreeMap::new(),
            projectiles: BTreeMap::new(),
            powerups: BTreeMap::new(),
            walls: BTreeMap::new(),
            beams: Vec::new(),
            frames: 0,
        }
    }

    /// The tank this client controls, once the server has reported it.
    pub fn own_tank(&self) -> Option<&Tank> {
        self.tanks.get(&self.player_id)
    }

    /// Decodes and applies one line. Undecodable lines are skipped.
    pub fn apply_line(&mut self, line: &str) -> Option<WorldEvent> {
        if line.trim().is_empty() {
            return None;
        }
        match WireRecord::decode(line) {
            Ok(record) => self.apply(record),
            Err(e) => {
                debug!("Skipping record: {}", e);
                None
            }
        }
    }

    /// Replace-or-insert by id. Dead projectiles and powerups, and
    /// disconnected tanks, are dropped right after being applied.
    pub fn apply(&mut self, record: WireRecord) -> Option<WorldEvent> {
        match record {
            WireRecord::Tank(tank) => {
                let id = tank.id;
                if tank.dc {
                    self.tanks.remove(&id);
                    return Some(WorldEvent::TankLeft(id));
                }
                let event = if tank.join {
                    Some(WorldEvent::TankJoined(id))
                } else if tank.died {
                    Some(WorldEvent::TankDied(id))
                } else {
                    None
                };
                self.tanks.insert(id, tank);
                event
            }
            WireRecord::Projectile(proj) => {
                if proj.died {
                    self.projectiles.remove(&proj.id);
                } else {
                    self.projectiles.insert(proj.id, proj);
                }
                None
            }
            WireRecord::Powerup(powerup) => {
                if powerup.died {
                    self.powerups.remove(&powerup.id);
                } else {
                    self.powerups.insert(powerup.id, powerup);
                }
                None
            }
            WireRecord::Wall(wall) => {
                self.walls.insert(wall.id, wall);
                None
            }
            WireRecord::Beam(beam) => {
                let owner = beam.owner;
                self.beams.push(DisplayedBeam {
                    beam,
                    frames_left: BEAM_DISPLAY_FRAMES,
                });
                Some(WorldEvent::BeamFired { owner })
            }
        }
    }

    /// Ages displayed beams by one frame and drops the expired ones.
    pub fn advance_frame(&mut self) {
        self.frames += 1;
        for displayed in self.beams.iter_mut() {
            displayed.frames_left = displayed.frames_left.saturating_sub(1);
        }
        self.beams.retain(|b| b.frames_left > 0);
    }

    /// Living tanks other than our own, nearest first.
    pub fn enemies_by_distance(&self) -> Vec<&Tank> {
        let Some(me) = self.own_tank() else {
            return Vec::new();
        };
        let mut enemies: Vec<&Tank> = self
            .tanks
            .values()
            .filter(|t| t.id != self.player_id && t.hp > 0)
            .collect();
        enemies.sort_by(|a, b| {
            let da = (a.loc - me.loc).magnitude();
            let db = (b.loc - me.loc).magnitude();
            da.total_cmp(&db)
        });
        enemies
    }
}
