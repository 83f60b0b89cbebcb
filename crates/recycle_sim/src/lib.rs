//! # Recycle Sim
//!
//! Reference host and frame loop for [`recycle_core`].
//!
//! [`SimHost`] plays the engine: it builds entities from templates, tracks
//! their active flag and parent, and stores their recycle handles.
//! [`SimLoop`] spawns from pools and ticks auto-return once per frame.
//!
//! ## Example
//!
//! ```rust,ignore
//! use recycle_sim::{SimConfig, SimLoop};
//!
//! let config = SimConfig::from_toml_file("config/pools.toml")?;
//! let mut sim = SimLoop::new(&config)?;
//!
//! sim.spawn(&"Bullet".into())?;
//! let frame = sim.step(config.frame_time_secs());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod entity;
pub mod error;
pub mod game_loop;
pub mod host;

pub use config::{SimConfig, TemplateConfig};
pub use entity::{EntityId, NodeId};
pub use error::{SimError, SimResult};
pub use game_loop::{FrameStats, FrameStatsAccumulator, SimLoop, TARGET_FRAME_TIME};
pub use host::{HostCounters, SimHost, SimObject};

/// Re-export of the pooling core.
pub use recycle_core as core;
