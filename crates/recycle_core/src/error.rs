//! # Error Types
//!
//! Two kinds of failure exist in the recycling layer:
//!
//! - [`Anomaly`]: caller mistakes that the manager absorbs. They are logged,
//!   recorded in the manager's anomaly log and never returned as `Err`.
//! - [`ConfigError`] / [`HandleError`]: hard errors returned to the caller.
//!
//! Factory failures from the host are neither. They propagate unchanged as
//! the host's own error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::key::{CategoryKey, ManagerId};

/// A misuse of the pool API that was absorbed instead of propagated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// The instance carries no recycle handle, so it cannot be pooled.
    #[error("instance {instance} has no recycle handle; destroyed")]
    MissingTrackingInfo {
        /// Debug rendering of the instance.
        instance: String,
    },

    /// An operation named a category with no registered pool.
    #[error("{operation}: no pool registered for category {category}")]
    UnknownCategory {
        /// The category that was looked up.
        category: CategoryKey,
        /// The operation that performed the lookup.
        operation: &'static str,
    },

    /// `create_pool` was called for a category that already has a pool.
    #[error("pool for category {category} already exists; keeping first registration")]
    DuplicateRegistration {
        /// The category registered twice.
        category: CategoryKey,
    },

    /// A teardown operation was skipped because shutdown has begun.
    #[error("{operation} skipped: shutdown in progress")]
    ShutdownInProgress {
        /// The skipped operation.
        operation: &'static str,
    },

    /// The instance's handle was minted by a different manager.
    #[error("instance {instance} of category {category} belongs to {owner}; destroyed")]
    ForeignInstance {
        /// Debug rendering of the instance.
        instance: String,
        /// Category recorded in the handle.
        category: CategoryKey,
        /// Manager recorded in the handle.
        owner: ManagerId,
    },

    /// An instance was released that the pool never handed out.
    #[error("released instance {instance} was not checked out of pool {category}")]
    UntrackedRelease {
        /// Debug rendering of the instance.
        instance: String,
        /// The pool it was released into.
        category: CategoryKey,
    },

    /// An instance already idle in the free-list was released again.
    #[error("instance {instance} is already idle in pool {category}")]
    DoubleRelease {
        /// Debug rendering of the instance.
        instance: String,
        /// The pool it was released into.
        category: CategoryKey,
    },

    /// An instance was returned under a category other than the one in its
    /// recycle handle. It is pooled under the category it was returned to.
    #[error("instance {instance} of category {expected} returned to pool {category}")]
    CategoryMismatch {
        /// Debug rendering of the instance.
        instance: String,
        /// Category recorded in the handle.
        expected: CategoryKey,
        /// The pool it was released into.
        category: CategoryKey,
    },

    /// A pool was requested with `initial_size > max_size`; max was raised.
    #[error("pool {category}: initial size {initial_size} exceeds max size {max_size}; max raised")]
    InvalidCapacity {
        /// The category being registered.
        category: CategoryKey,
        /// Requested initial size.
        initial_size: usize,
        /// Requested max size.
        max_size: usize,
    },
}

/// Errors raised while loading pool configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read pool config {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration was not valid TOML for the expected schema.
    #[error("invalid pool config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A size policy has `initial_size > max_size`.
    #[error("invalid policy for {scope}: initial size {initial_size} exceeds max size {max_size}")]
    InvalidPolicy {
        /// `"default"` or the preset's category.
        scope: String,
        /// Configured initial size.
        initial_size: usize,
        /// Configured max size.
        max_size: usize,
    },

    /// Two presets name the same category.
    #[error("duplicate preset for category {0}")]
    DuplicatePreset(CategoryKey),
}

/// Errors raised by recycle handle storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// The slot already holds a handle; handles are bound once.
    #[error("recycle handle already bound to category {category}")]
    AlreadyBound {
        /// Category of the handle already in the slot.
        category: CategoryKey,
    },
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
