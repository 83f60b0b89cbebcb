//! # Simulation Configuration
//!
//! One TOML document configures the host, the frame loop and the pools.
//! See `config/pools.toml` for the soak-run file.

use std::collections::HashSet;
use std::path::Path;

use recycle_core::{CategoryKey, ConfigError, PoolManagerConfig};
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Template the host instantiates for a category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Category served by the template.
    pub category: CategoryKey,
    /// Display name; instances are named "<name> <serial>".
    pub name: String,
    /// Seconds an instance stays out before it auto-returns. `None` keeps it
    /// out until despawned.
    #[serde(default)]
    pub lifetime_secs: Option<f32>,
}

/// Configuration for [`SimHost`](crate::SimHost) and [`SimLoop`](crate::SimLoop).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Maximum number of live entities.
    pub max_entities: usize,
    /// Target frames per second for fixed-step runs.
    pub target_fps: u32,
    /// Templates registered with the host.
    pub templates: Vec<TemplateConfig>,
    /// Pool manager configuration.
    pub pools: PoolManagerConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_entities: 100_000,
            target_fps: 60,
            templates: Vec::new(),
            pools: PoolManagerConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`SimError::Config`] for malformed input or invalid pool policies,
    /// [`SimError::DuplicateTemplate`] for repeated template categories.
    pub fn from_toml_str(source: &str) -> SimResult<Self> {
        let config: Self = toml::from_str(source).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`SimError::Config`] if the file cannot be read, otherwise the errors
    /// of [`from_toml_str`](Self::from_toml_str).
    pub fn from_toml_file(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Validates the pool configuration and template uniqueness.
    ///
    /// # Errors
    ///
    /// See [`from_toml_str`](Self::from_toml_str).
    pub fn validate(&self) -> SimResult<()> {
        self.pools.validate()?;

        let mut seen = HashSet::with_capacity(self.templates.len());
        for template in &self.templates {
            if !seen.insert(&template.category) {
                return Err(SimError::DuplicateTemplate(template.category.clone()));
            }
        }
        Ok(())
    }

    /// Returns the fixed-step frame duration in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn frame_time_secs(&self) -> f32 {
        1.0 / self.target_fps.max(1) as f32
    }
}
