//! Server settings: world size, frame budget, weapon/respawn timing and the
//! wall layout. Loaded once at startup from a JSON file; any failure here is
//! fatal to the process.

use serde::Deserialize;
use shared::{
    Vector2D, Wall, DEFAULT_FRAMES_PER_SHOT, DEFAULT_MAX_POWERUPS, DEFAULT_MAX_POWERUP_DELAY,
    DEFAULT_MS_PER_FRAME, DEFAULT_RESPAWN_RATE, DEFAULT_UNIVERSE_SIZE,
};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Endpoints of one wall segment as written in the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WallConfig {
    pub p1: Vector2D,
    pub p2: Vector2D,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Side length of the square world.
    pub universe_size: u32,
    /// Minimum wall-clock time between ticks.
    pub ms_per_frame: u64,
    /// Ticks a tank must wait between main-weapon shots.
    pub frames_per_shot: u32,
    /// Ticks a dead tank waits before respawning.
    pub respawn_rate: u32,
    pub max_powerups: usize,
    pub max_powerup_delay: u32,
    /// Seed for spawn and timer randomness; entropy when absent.
    pub seed: Option<u64>,
    pub walls: Vec<WallConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            universe_size: DEFAULT_UNIVERSE_SIZE,
            ms_per_frame: DEFAULT_MS_PER_FRAME,
            frames_per_shot: DEFAULT_FRAMES_PER_SHOT,
            respawn_rate: DEFAULT_RESPAWN_RATE,
            max_powerups: DEFAULT_MAX_POWERUPS,
            max_powerup_delay: DEFAULT_MAX_POWERUP_DELAY,
            seed: None,
            walls: Vec::new(),
        }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.universe_size == 0 {
            return Err(ConfigError::Invalid {
                field: "universe_size",
                reason: "must be positive".to_string(),
            });
        }
        if self.ms_per_frame == 0 {
            return Err(ConfigError::Invalid {
                field: "ms_per_frame",
                reason: "must be positive".to_string(),
            });
        }
        if self.max_powerup_delay == 0 {
            return Err(ConfigError::Invalid {
                field: "max_powerup_delay",
                reason: "must be positive".to_string(),
            });
        }
        for (index, wall) in self.walls.iter().enumerate() {
            if wall.p1.x != wall.p2.x && wall.p1.y != wall.p2.y {
                return Err(ConfigError::Invalid {
                    field: "walls",
                    reason: format!("wall {} is not horizontal or vertical", index),
                });
            }
        }
        Ok(())
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.ms_per_frame)
    }

    /// Walls numbered in file order.
    pub fn build_walls(&self) -> Vec<Wall> {
        self.walls
            .iter()
            .enumerate()
            .map(|(id, wall)| Wall::new(id as i32, wall.p1, wall.p2))
            .collect()
    }
}
