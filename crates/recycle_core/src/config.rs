//! # Pool Configuration
//!
//! Presets are loaded once at startup from TOML:
//!
//! ```toml
//! anomaly_log_capacity = 32
//!
//! [default_policy]
//! initial_size = 10
//! max_size = 100
//!
//! [[presets]]
//! category = "Bullet"
//! initial_size = 5
//! max_size = 10
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::key::CategoryKey;

/// Default number of instances warmed when a pool is auto-created.
pub const DEFAULT_INITIAL_SIZE: usize = 10;

/// Default free-list bound for an auto-created pool.
pub const DEFAULT_MAX_SIZE: usize = 100;

/// Default number of anomalies kept in the manager's log.
pub const DEFAULT_ANOMALY_LOG_CAPACITY: usize = 64;

/// Size parameters of a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolPolicy {
    /// Instances created up front and parked in the free-list.
    pub initial_size: usize,
    /// Upper bound on the free-list. Released instances beyond it are destroyed.
    pub max_size: usize,
}

impl PoolPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(initial_size: usize, max_size: usize) -> Self {
        Self {
            initial_size,
            max_size,
        }
    }

    /// Returns true if `initial_size <= max_size`.
    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.initial_size <= self.max_size
    }
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_SIZE, DEFAULT_MAX_SIZE)
    }
}

/// A pool registered eagerly when the manager initializes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolPreset {
    /// Category the pool serves.
    pub category: CategoryKey,
    /// Instances warmed at initialization.
    #[serde(default)]
    pub initial_size: usize,
    /// Free-list bound.
    pub max_size: usize,
}

impl PoolPreset {
    /// Creates a preset.
    #[must_use]
    pub fn new(category: impl Into<CategoryKey>, initial_size: usize, max_size: usize) -> Self {
        Self {
            category: category.into(),
            initial_size,
            max_size,
        }
    }

    /// Returns the preset's size policy.
    #[inline]
    #[must_use]
    pub const fn policy(&self) -> PoolPolicy {
        PoolPolicy::new(self.initial_size, self.max_size)
    }
}

/// Configuration for a [`PoolManager`](crate::PoolManager).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolManagerConfig {
    /// Policy used when `get_pooled_object` meets an unregistered category.
    pub default_policy: PoolPolicy,
    /// Number of anomalies retained for inspection. Older entries are dropped.
    pub anomaly_log_capacity: usize,
    /// Pools created by `initialize`.
    pub presets: Vec<PoolPreset>,
}

impl Default for PoolManagerConfig {
    fn default() -> Self {
        Self {
            default_policy: PoolPolicy::default(),
            anomaly_log_capacity: DEFAULT_ANOMALY_LOG_CAPACITY,
            presets: Vec::new(),
        }
    }
}

impl PoolManagerConfig {
    /// Adds a preset, builder style.
    #[must_use]
    pub fn with_preset(mut self, preset: PoolPreset) -> Self {
        self.presets.push(preset);
        self
    }

    /// Replaces the auto-create policy, builder style.
    #[must_use]
    pub fn with_default_policy(mut self, policy: PoolPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed input and the
    /// [`validate`](Self::validate) errors for inconsistent sizes.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// errors of [`from_toml_str`](Self::from_toml_str).
    pub fn from_toml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks every policy and rejects duplicate presets.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidPolicy`] or [`ConfigError::DuplicatePreset`].
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.default_policy.is_valid() {
            return Err(ConfigError::InvalidPolicy {
                scope: "default".to_owned(),
                initial_size: self.default_policy.initial_size,
                max_size: self.default_policy.max_size,
            });
        }

        let mut seen = HashSet::with_capacity(self.presets.len());
        for preset in &self.presets {
            if !preset.policy().is_valid() {
                return Err(ConfigError::InvalidPolicy {
                    scope: preset.category.to_string(),
                    initial_size: preset.initial_size,
                    max_size: preset.max_size,
                });
            }
            if !seen.insert(&preset.category) {
                return Err(ConfigError::DuplicatePreset(preset.category.clone()));
            }
        }
        Ok(())
    }
}
