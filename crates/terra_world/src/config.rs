//! # World Configuration
//!
//! Loaded once at startup from TOML.
//!
//! ```toml
//! chunk_size = 100
//! water_level = 0.35
//! always_regenerate = false
//! debug_terrain = false
//!
//! [world_generator]
//! octaves = 7
//! persistence = 0.8
//! seed = 12345
//!
//! [local_generator]
//! octaves = 4
//! persistence = 0.5
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use terra_procedural::GeneratorConfig;

use crate::error::ConfigError;

/// Settings of the chunk service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Edge length of a chunk in world cells (and samples per edge).
    pub chunk_size: u32,
    /// Sea level reported with every generated chunk.
    pub water_level: f32,
    /// Debug mode: regenerate world chunks with a fresh seed on every
    /// request, bypassing stored terrain.
    pub always_regenerate: bool,
    /// Log generated and served terrain at debug level.
    pub debug_terrain: bool,
    /// Generator for global (overview) chunks.
    pub world_generator: GeneratorConfig,
    /// Generator for local quadrant chunks.
    pub local_generator: GeneratorConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            water_level: 0.35,
            always_regenerate: false,
            debug_terrain: false,
            world_generator: GeneratorConfig::default(),
            local_generator: GeneratorConfig {
                octaves: 4,
                persistence: 0.5,
                ..GeneratorConfig::default()
            },
        }
    }
}

impl WorldConfig {
    /// Parses a config from TOML text and validates it.
    ///
    /// Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed TOML, unknown keys, or invalid values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails
    /// [`WorldConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("Loaded world config from {}", path.display());
        Ok(config)
    }

    /// Checks every value range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be positive".into()));
        }
        if !self.water_level.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "water_level must be finite, got {}",
                self.water_level
            )));
        }
        self.world_generator
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("world_generator: {e}")))?;
        self.local_generator
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("local_generator: {e}")))?;
        Ok(())
    }
}
