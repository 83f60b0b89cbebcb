//! # Simulation Error Types

use recycle_core::{CategoryKey, ConfigError};
use thiserror::Error;

/// Errors raised by the reference host and frame loop.
#[derive(Error, Debug)]
pub enum SimError {
    /// No template is registered for the category.
    #[error("no template registered for category {0}")]
    UnknownTemplate(CategoryKey),

    /// Every entity slot is in use.
    #[error("world full: capacity {capacity} entities")]
    WorldFull {
        /// Maximum number of live entities.
        capacity: usize,
    },

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Two templates name the same category.
    #[error("duplicate template for category {0}")]
    DuplicateTemplate(CategoryKey),
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
