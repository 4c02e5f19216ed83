//! # Simulation Configuration
//!
//! Loaded once at startup from a TOML file. Every field has a default, so an
//! empty file (or no file) yields a runnable configuration.
//!
//! ```toml
//! width = 64
//! height = 32
//! seed = 7
//! agents = 40
//! properties = 120
//! steps = 500
//! max_entities = 1024
//! vacuum_every = 50
//! log_filter = "entler=debug"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Parameters of one simulation run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Scene width in cells.
    pub width: usize,
    /// Scene height in cells.
    pub height: usize,
    /// Seed of the placement RNG.
    pub seed: u64,
    /// Number of moving agents to spawn.
    pub agents: usize,
    /// Number of cell properties to spawn.
    pub properties: usize,
    /// Number of steps to run.
    pub steps: u64,
    /// Per-table entity budget; selects a fixed allocator when set.
    pub max_entities: Option<usize>,
    /// Steps between vacuums; `0` disables vacuuming.
    pub vacuum_every: u64,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            seed: 0,
            agents: 16,
            properties: 64,
            steps: 100,
            max_entities: None,
            vacuum_every: 25,
            log_filter: "info".to_owned(),
        }
    }
}

impl SimulationConfig {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, and the errors
    /// of [`SimulationConfig::from_toml_str`] otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Number of cells in the scene.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Checks that the values describe a runnable simulation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the grid is empty or too large,
    /// if agents or properties do not fit on the grid, or if the entity
    /// budget is smaller than the requested population.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "scene must not be empty, got {}x{}",
                self.width, self.height
            )));
        }
        if i32::try_from(self.width).is_err()
            || i32::try_from(self.height).is_err()
            || self.width.checked_mul(self.height).is_none()
        {
            return Err(ConfigError::Invalid(format!(
                "scene {}x{} exceeds the coordinate range",
                self.width, self.height
            )));
        }
        let cells = self.cell_count();
        if self.agents > cells {
            return Err(ConfigError::Invalid(format!(
                "{} agents do not fit on {cells} cells",
                self.agents
            )));
        }
        if self.properties > cells {
            return Err(ConfigError::Invalid(format!(
                "{} properties do not fit on {cells} cells",
                self.properties
            )));
        }
        if let Some(budget) = self.max_entities {
            let population = self.agents + self.properties;
            if budget < population.max(1) {
                return Err(ConfigError::Invalid(format!(
                    "entity budget {budget} is smaller than the population of {population}"
                )));
            }
        }
        Ok(())
    }
}
