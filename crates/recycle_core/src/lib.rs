//! # Recycle Core
//!
//! Object recycling for a real-time simulation loop. Expensive engine
//! objects (bullets, sparks, debris) are handed out from per-category pools
//! and parked again instead of being destroyed and rebuilt every frame.
//!
//! ## Architecture Rules
//!
//! 1. **Bounded idle memory** - Each pool's free-list has a hard max; extra
//!    releases are destroyed
//! 2. **One owner** - Only the [`PoolManager`] mutates pool state; handles
//!    call back into it
//! 3. **Absorb misuse** - Caller mistakes become logged [`Anomaly`] records,
//!    never panics or errors. Factory failures are the one exception
//! 4. **Single-threaded** - Every call runs on the simulation thread
//!
//! ## Example
//!
//! ```rust,ignore
//! use recycle_core::{AutoReturnSet, CategoryKey, PoolManager, PoolManagerConfig};
//!
//! let config = PoolManagerConfig::from_toml_file("config/pools.toml")?;
//! let mut pools = PoolManager::new(host, config);
//! pools.initialize()?;
//!
//! let bullet = CategoryKey::new("Bullet");
//! let shot = pools.get_pooled_object(&bullet)?;
//!
//! let mut timers = AutoReturnSet::new();
//! timers.arm(&pools, shot, 1.5);
//!
//! // Once per frame:
//! timers.tick(delta_time, &mut pools);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod auto_return;
pub mod config;
pub mod error;
pub mod handle;
pub mod host;
pub mod key;
pub mod manager;
pub mod pool;

#[cfg(test)]
mod test_host;

pub use auto_return::{AutoReturn, AutoReturnSet};
pub use config::{PoolManagerConfig, PoolPolicy, PoolPreset};
pub use error::{Anomaly, ConfigError, ConfigResult, HandleError};
pub use handle::{RecycleHandle, RecycleSlot};
pub use host::{Host, Instantiator, SceneGraph};
pub use key::{CategoryKey, ManagerId};
pub use manager::{PoolDescriptor, PoolManager, ReturnOutcome};
pub use pool::{Pool, PoolHooks, PoolStats, Release};
