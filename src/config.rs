//! Blast configuration
//!
//! One immutable value handed to the compositor and the scheduler. Updates
//! replace the whole value; nothing reads ambient mutable settings.

use crate::display::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::error::{BlastError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Discrete choices offered for fog height and propagation speed
pub const PERCENT_OPTIONS: [f64; 10] = [1.0, 0.9, 0.8, 0.7, 0.6, 0.5, 0.4, 0.3, 0.2, 0.1];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlastConfig {
    /// Scheduler ticks per second at full propagation speed
    pub moves_per_second: u32,
    /// Radius added to every live blast per tick
    pub blast_increment: f64,
    /// Ticks a blast lives; `max_radius = max_iterations * blast_increment`
    pub max_iterations: u32,
    /// Scales cloud opacity, (0, 1]
    pub fog_height: f64,
    /// Scales the effective tick rate, (0, 1]
    pub propagation_speed: f64,
    /// Seed of the compositor's noise generator
    pub seed: u64,
    pub sprite_size: u32,
    pub crosshair_size: u32,
    pub width: u32,
    pub height: u32,
    pub mqtt: Option<MqttConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default = "default_mqtt_topic")]
    pub topic: String,
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_mqtt_topic() -> String {
    "blastfield".to_string()
}

impl Default for BlastConfig {
    fn default() -> Self {
        Self {
            moves_per_second: 60,
            blast_increment: 0.6,
            max_iterations: 200,
            fog_height: 1.0,
            propagation_speed: 1.0,
            seed: 48,
            sprite_size: 80,
            crosshair_size: 50,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            mqtt: None,
        }
    }
}

impl BlastConfig {
    /// Radius at which a blast retires
    pub fn max_radius(&self) -> f64 {
        self.max_iterations as f64 * self.blast_increment
    }

    /// Tick rate after applying the propagation speed
    pub fn effective_moves_per_second(&self) -> f64 {
        self.moves_per_second as f64 * (1.0 + self.propagation_speed) / 2.0
    }

    /// Sleep between two scheduler ticks, never below 1 ms
    pub fn tick_interval(&self) -> Duration {
        let moves = self.effective_moves_per_second().max(f64::MIN_POSITIVE);
        let ms = (1000.0 / moves).max(1.0);
        Duration::from_secs_f64(ms / 1000.0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.moves_per_second == 0 {
            return Err(invalid("moves_per_second", "must be positive"));
        }
        if !(self.blast_increment.is_finite() && self.blast_increment > 0.0) {
            return Err(invalid("blast_increment", "must be a positive number"));
        }
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", "must be positive"));
        }
        check_unit("fog_height", self.fog_height)?;
        check_unit("propagation_speed", self.propagation_speed)?;
        if self.width == 0 || self.height == 0 {
            return Err(invalid("width/height", "must be non-zero"));
        }
        Ok(())
    }

    /// Replace the fog height, keeping everything else
    pub fn with_fog_height(mut self, fog_height: f64) -> Result<Self> {
        check_unit("fog_height", fog_height)?;
        self.fog_height = fog_height;
        Ok(self)
    }

    /// Replace the propagation speed, keeping everything else
    pub fn with_propagation_speed(mut self, speed: f64) -> Result<Self> {
        check_unit("propagation_speed", speed)?;
        self.propagation_speed = speed;
        Ok(self)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

fn invalid(field: &'static str, reason: &str) -> BlastError {
    BlastError::InvalidConfig {
        field,
        reason: reason.to_string(),
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(BlastError::InvalidConfig {
            field,
            reason: format!("{} is outside (0, 1]", value),
        })
    }
}
