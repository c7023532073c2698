//! Simulation Configuration
//!
//! Tunables that the engine reads from its config layer. All have defaults
//! matching the stock game, so an empty JSON object is a valid config.

use std::path::Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not read the file
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that failed
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Malformed JSON
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Simulation tunables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Downward acceleration per elapsed tick
    pub gravity: i32,
    /// Radius of area attacks issued on impact
    pub aoe_damage_distance: i32,
    /// Radius of the grandmaster shrinking ray
    pub shrink_ray_aoe_distance: i32,
    /// Ticks an expired temporary sprite keeps simulating
    pub lifetime_grace_ticks: i32,
    /// Number of d20 rolled for trap damage on this map
    pub trap_d20_count: u32,
    /// Seed of the simulation RNG
    pub rng_seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gravity: 5,
            aoe_damage_distance: 512,
            shrink_ray_aoe_distance: 512,
            lifetime_grace_ticks: 0,
            trap_d20_count: 0,
            rng_seed: 0,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gravity < 0 {
            return Err(ConfigError::Invalid(format!("gravity must be >= 0, got {}", self.gravity)));
        }
        if self.aoe_damage_distance <= 0 {
            return Err(ConfigError::Invalid("aoe_damage_distance must be positive".into()));
        }
        if self.shrink_ray_aoe_distance <= 0 {
            return Err(ConfigError::Invalid("shrink_ray_aoe_distance must be positive".into()));
        }
        if self.lifetime_grace_ticks < 0 {
            return Err(ConfigError::Invalid("lifetime_grace_ticks must be >= 0".into()));
        }
        Ok(())
    }
}
