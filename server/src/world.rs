//! Authoritative world simulation.
//!
//! [`World`] owns every entity collection and is their only mutator. One call
//! to [`World::update`] advances the simulation by exactly one tick; the order
//! of the phases inside it defines every tie-break (for example, a beam fired
//! this tick is resolved after projectile hits).

use crate::config::Settings;
use crate::physics::{collides_with_any_wall, find_spawn_location, intersects};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    Beam, ControlCommand, EntityId, FireMode, Powerup, Projectile, Tank, Wall, BEAM_HIT_RADIUS,
    PROJECTILE_DAMAGE,
};
use std::collections::{BTreeMap, HashMap};

/// What was removed by [`World::purge_reported`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Purged {
    pub tanks: Vec<EntityId>,
    pub projectiles: usize,
    pub powerups: usize,
}

pub struct World {
    size: f64,
    frames_per_shot: u32,
    respawn_rate: u32,
    max_powerup_delay: u32,

    tanks: BTreeMap<EntityId, Tank>,
    projectiles: BTreeMap<EntityId, Projectile>,
    powerups: BTreeMap<EntityId, Powerup>,
    walls: Vec<Wall>,
    beams: Vec<Beam>,

    /// One countdown per powerup slot; 0 means the slot may respawn.
    powerup_timers: Vec<u32>,

    next_tank_id: EntityId,
    next_projectile_id: EntityId,
    next_powerup_id: EntityId,

    tick: u64,
    rng: StdRng,
}

impl World {
    /// Builds a world from settings and fills every powerup slot.
    pub fn new(settings: &Settings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(settings, rng)
    }

    pub fn with_rng(settings: &Settings, rng: StdRng) -> Self {
        let mut world = Self {
            size: settings.universe_size as f64,
            frames_per_shot: settings.frames_per_shot,
            respawn_rate: settings.respawn_rate,
            max_powerup_delay: settings.max_powerup_delay.max(1),
            tanks: BTreeMap::new(),
            projectiles: BTreeMap::new(),
            powerups: BTreeMap::new(),
            walls: settings.build_walls(),
            beams: Vec::new(),
            powerup_timers: vec![0; settings.max_powerups],
            next_tank_id: 0,
            next_projectile_id: 0,
            next_powerup_id: 0,
            tick: 0,
            rng,
        };

        for _ in 0..settings.max_powerups {
            world.add_powerup();
        }

        info!(
            "World created: size {}, {} walls, {} powerups",
            world.size,
            world.walls.len(),
            world.powerups.len()
        );
        world
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn tanks(&self) -> impl Iterator<Item = &Tank> {
        self.tanks.values()
    }

    pub fn projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.values()
    }

    pub fn powerups(&self) -> impl Iterator<Item = &Powerup> {
        self.powerups.values()
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    /// Beams fired during the most recent tick.
    pub fn beams(&self) -> &[Beam] {
        &self.beams
    }

    pub fn tank(&self, id: EntityId) -> Option<&Tank> {
        self.tanks.get(&id)
    }

    pub fn tank_mut(&mut self, id: EntityId) -> Option<&mut Tank> {
        self.tanks.get_mut(&id)
    }

    pub fn powerup_timers(&self) -> &[u32] {
        &self.powerup_timers
    }

    /// Id the next [`World::add_tank`] call will assign.
    pub fn next_tank_id(&self) -> EntityId {
        self.next_tank_id
    }

    /// Registers a new tank at a wall-free spawn point and returns its id.
    pub fn add_tank(&mut self, name: &str) -> EntityId {
        let id = self.next_tank_id;
        self.next_tank_id += 1;

        let spawn = find_spawn_location(&mut self.rng, self.size, &self.walls);
        self.tanks.insert(id, Tank::new(id, name, spawn));
        info!("Added tank {} ({:?}) at ({:.1}, {:.1})", id, name, spawn.x, spawn.y);
        id
    }

    /// Zeroes the tank's hp and marks it disconnected. The record stays until
    /// the next broadcast has reported it.
    pub fn disconnect_tank(&mut self, id: EntityId) {
        if let Some(tank) = self.tanks.get_mut(&id) {
            tank.disconnect();
            info!("Tank {} disconnected", id);
        }
    }

    /// Advances the world by one tick using the latest command per tank.
    pub fn update(&mut self, commands: &HashMap<EntityId, ControlCommand>) {
        self.tick += 1;
        self.beams.clear();

        for tank in self.tanks.values_mut() {
            tank.begin_tick();
        }

        self.apply_commands(commands);
        self.move_tanks();
        self.respawn_tanks();

        for tank in self.tanks.values_mut() {
            tank.decrement_fire_cooldown();
            tank.decrement_respawn_cooldown();
        }

        self.update_projectiles();
        self.collect_powerups();
        self.tick_powerup_timers();
        self.resolve_beams();
    }

    fn apply_commands(&mut self, commands: &HashMap<EntityId, ControlCommand>) {
        for tank in self.tanks.values_mut() {
            let Some(cmd) = commands.get(&tank.id) else {
                continue;
            };

            if let Some(moving) = cmd.moving {
                match moving.heading() {
                    Some(dir) => tank.drive(dir),
                    None => tank.halt(),
                }
            }
            if let Some(tdir) = cmd.tdir {
                tank.aim(tdir);
            }

            if tank.is_frozen() {
                continue;
            }

            match cmd.fire_mode() {
                FireMode::Main => {
                    if tank.can_shoot() {
                        let id = self.next_projectile_id;
                        self.next_projectile_id += 1;
                        self.projectiles
                            .insert(id, Projectile::new(id, tank.loc, tank.tdir, tank.id));
                        tank.fired(self.frames_per_shot);
                    }
                }
                FireMode::Alt => {
                    if tank.use_alt() {
                        let id = self.beams.len() as EntityId;
                        self.beams.push(Beam::new(id, tank.loc, tank.tdir, tank.id));
                    }
                }
                FireMode::None => {}
            }
        }
    }

    fn move_tanks(&mut self) {
        let walls = &self.walls;
        for tank in self.tanks.values_mut() {
            if tank.is_frozen() || tank.speed() == 0.0 {
                continue;
            }

            // A wrap can land on the far side of a wall, so both ends count.
            let blocked = collides_with_any_wall(tank.next_location(), walls)
                || collides_with_any_wall(tank.destination(self.size), walls);
            if !blocked {
                tank.advance(self.size);
            }
        }
    }

    fn respawn_tanks(&mut self) {
        for tank in self.tanks.values_mut() {
            if tank.needs_respawn() {
                let spawn = find_spawn_location(&mut self.rng, self.size, &self.walls);
                tank.respawn(spawn);
                debug!("Tank {} respawned at ({:.1}, {:.1})", tank.id, spawn.x, spawn.y);
            }
        }
    }

    fn update_projectiles(&mut self) {
        for proj in self.projectiles.values_mut() {
            if proj.died {
                continue;
            }

            proj.advance();

            if self.walls.iter().any(|w| w.area().contains(proj.loc)) {
                proj.died = true;
                continue;
            }

            let victim = self
                .tanks
                .values()
                .find(|t| t.id != proj.owner && t.is_alive() && t.area().contains(proj.loc))
                .map(|t| t.id);

            if let Some(victim_id) = victim {
                proj.died = true;
                let killed = match self.tanks.get_mut(&victim_id) {
                    Some(tank) => {
                        tank.take_damage(PROJECTILE_DAMAGE);
                        if tank.hp <= 0 {
                            tank.kill(self.respawn_rate);
                            true
                        } else {
                            false
                        }
                    }
                    None => false,
                };
                if killed {
                    if let Some(owner) = self.tanks.get_mut(&proj.owner) {
                        owner.award_kill();
                    }
                    debug!("Tank {} destroyed by projectile of {}", victim_id, proj.owner);
                }
                continue;
            }

            if proj.is_out_of_bounds(self.size) {
                proj.died = true;
            }
        }
    }

    fn collect_powerups(&mut self) {
        for powerup in self.powerups.values_mut() {
            if powerup.died {
                continue;
            }

            let collector = self
                .tanks
                .values_mut()
                .find(|t| t.is_alive() && t.area().contains(powerup.loc));

            if let Some(tank) = collector {
                powerup.died = true;
                tank.pick_up_powerup();

                if let Some(slot) = self.powerup_timers.iter_mut().find(|t| **t == 0) {
                    *slot = self.rng.gen_range(0..self.max_powerup_delay);
                }
            }
        }
    }

    fn tick_powerup_timers(&mut self) {
        for timer in self.powerup_timers.iter_mut() {
            *timer = timer.saturating_sub(1);
        }

        let missing = self.completed_timers().saturating_sub(self.living_powerups());
        for _ in 0..missing {
            self.add_powerup();
        }
    }

    fn resolve_beams(&mut self) {
        for beam in &self.beams {
            let mut kills = 0;
            for tank in self.tanks.values_mut() {
                if tank.id == beam.owner || !tank.is_alive() {
                    continue;
                }
                if intersects(beam.org, beam.dir, tank.loc, BEAM_HIT_RADIUS) {
                    tank.take_beam_hit();
                    tank.kill(self.respawn_rate);
                    kills += 1;
                    debug!("Tank {} destroyed by beam of {}", tank.id, beam.owner);
                }
            }
            if let Some(owner) = self.tanks.get_mut(&beam.owner) {
                owner.score += kills;
            }
        }
    }

    fn add_powerup(&mut self) {
        let id = self.next_powerup_id;
        self.next_powerup_id += 1;

        let spawn = find_spawn_location(&mut self.rng, self.size, &self.walls);
        self.powerups.insert(id, Powerup::new(id, spawn));
    }

    /// Powerups that have not been collected.
    pub fn living_powerups(&self) -> usize {
        self.powerups.values().filter(|p| !p.died).count()
    }

    /// Respawn slots whose countdown has elapsed.
    pub fn completed_timers(&self) -> usize {
        self.powerup_timers.iter().filter(|t| **t == 0).count()
    }

    /// Drops everything the last broadcast reported as gone: disconnected
    /// tanks, dead projectiles and collected powerups. Also clears the
    /// one-shot join flags.
    pub fn purge_reported(&mut self) -> Purged {
        let tanks: Vec<EntityId> = self
            .tanks
            .values()
            .filter(|t| t.dc)
            .map(|t| t.id)
            .collect();
        for id in &tanks {
            self.tanks.remove(id);
        }
        for tank in self.tanks.values_mut() {
            tank.join = false;
        }

        let projectiles_before = self.projectiles.len();
        self.projectiles.retain(|_, p| !p.died);
        let powerups_before = self.powerups.len();
        self.powerups.retain(|_, p| !p.died);

        Purged {
            tanks,
            projectiles: projectiles_before - self.projectiles.len(),
            powerups: powerups_before - self.powerups.len(),
        }
    }
}
