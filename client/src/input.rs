//! Turns held keys, fire buttons and an aim point into control commands

use crate::game::ClientWorld;
use rand::Rng;
use shared::{ControlCommand, FireMode, MoveDirection, Vector2D};

/// Tracks the player's intent between frames
#[derive(Debug, Clone)]
pub struct InputManager {
    /// Held movement keys in press order; the last one wins.
    held: Vec<MoveDirection>,
    main_held: bool,
    alt_pending: bool,
    aim: Vector2D,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            held: Vec::new(),
            main_held: false,
            alt_pending: false,
            aim: Vector2D::UP,
        }
    }

    pub fn press(&mut self, direction: MoveDirection) {
        if direction == MoveDirection::None {
            return;
        }
        self.held.retain(|d| *d != direction);
        self.held.push(direction);
    }

    pub fn release(&mut self, direction: MoveDirection) {
        self.held.retain(|d| *d != direction);
    }

    pub fn release_all(&mut self) {
        self.held.clear();
    }

    pub fn set_main_fire(&mut self, held: bool) {
        self.main_held = held;
    }

    /// Requests one alt shot with the next command.
    pub fn fire_alt(&mut self) {
        self.alt_pending = true;
    }

    /// Aims from `from` toward `target`. Keeps the previous aim if they coincide.
    pub fn aim_at(&mut self, from: Vector2D, target: Vector2D) {
        let offset = target - from;
        if !offset.is_zero() {
            self.aim = offset.normalize();
        }
    }

    pub fn aim(&self) -> Vector2D {
        self.aim
    }

    pub fn movement(&self) -> MoveDirection {
        self.held.last().copied().unwrap_or(MoveDirection::None)
    }

    /// Builds this frame's command. Alt fire takes priority over main fire
    /// and is consumed.
    pub fn command(&mut self) -> ControlCommand {
        let fire = if self.alt_pending {
            self.alt_pending = false;
            FireMode::Alt
        } else if self.main_held {
            FireMode::Main
        } else {
            FireMode::None
        };
        ControlCommand::new(self.movement(), fire, self.aim)
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Frames the bot keeps a heading before picking a new one.
const WANDER_FRAMES: u64 = 45;

/// Scripted player used by the headless client
pub struct Autopilot<R: Rng> {
    input: InputManager,
    rng: R,
}

impl<R: Rng> Autopilot<R> {
    pub fn new(rng: R) -> Self {
        Self {
            input: InputManager::new(),
            rng,
        }
    }

    /// Decides the next command from the mirrored world: wander, aim at the
    /// nearest enemy, keep the main gun firing and occasionally try the beam.
    pub fn next_command(&mut self, world: &ClientWorld) -> ControlCommand {
        if world.frames % WANDER_FRAMES == 0 {
            let direction = match self.rng.gen_range(0..5) {
                0 => MoveDirection::Up,
                1 => MoveDirection::Down,
                2 => MoveDirection::Left,
                3 => MoveDirection::Right,
                _ => MoveDirection::None,
            };
            self.input.release_all();
            self.input.press(direction);
        }

        let me = world.own_tank().map(|t| t.loc);
        let target = world.enemies_by_distance().first().map(|t| t.loc);
        match (me, target) {
            (Some(me), Some(target)) => {
                self.input.set_main_fire(true);
                self.input.aim_at(me, target);
                if self.rng.gen_bool(0.02) {
                    self.input.fire_alt();
                }
            }
            _ => self.input.set_main_fire(false),
        }

        self.input.command()
    }
}
