//! # Simulation Frame Loop
//!
//! ```text
//! Frame N:
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ 1. SPAWN (caller)                                               │
//! │    └─ spawn(category) ── get_pooled_object ── arm auto-return   │
//! │                                                                 │
//! │ 2. STEP (delta time)                                            │
//! │    ├─ Tick every armed countdown                                │
//! │    └─ Return fired instances through their recycle handles      │
//! │                                                                 │
//! │ 3. END FRAME                                                    │
//! │    └─ Record spawn/return/eviction counts                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use recycle_core::{AutoReturnSet, CategoryKey, PoolManager, ReturnOutcome};

use crate::config::SimConfig;
use crate::entity::EntityId;
use crate::error::SimResult;
use crate::host::SimHost;

/// Target frame time for 60 FPS.
pub const TARGET_FRAME_TIME: Duration = Duration::from_micros(16_666);

/// Statistics for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number.
    pub frame: u64,
    /// Instances handed out this frame.
    pub spawned: u32,
    /// Instances parked back in a free-list this frame.
    pub pooled: u32,
    /// Instances destroyed on return because a free-list was full.
    pub evicted: u32,
    /// Instances destroyed on return because they could not be pooled.
    pub destroyed: u32,
    /// Live entities at the end of the frame.
    pub live_entities: usize,
    /// Wall time spent in `step`, in microseconds.
    pub step_us: u64,
}

impl FrameStats {
    fn record(&mut self, outcome: ReturnOutcome) {
        match outcome {
            ReturnOutcome::Pooled => self.pooled += 1,
            ReturnOutcome::Evicted => self.evicted += 1,
            ReturnOutcome::Destroyed => self.destroyed += 1,
            ReturnOutcome::AlreadyIdle => {}
        }
    }
}

/// Accumulator for frame statistics.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Total frames recorded.
    pub frames_recorded: u64,
    /// Sum of spawns.
    pub spawned_sum: u64,
    /// Sum of pooled returns.
    pub pooled_sum: u64,
    /// Sum of evictions.
    pub evicted_sum: u64,
    /// Sum of forced destroys.
    pub destroyed_sum: u64,
    /// Highest live entity count seen at a frame end.
    pub peak_live: usize,
    /// Sum of step times.
    pub step_us_sum: u64,
    /// Max step time.
    pub max_step_us: u64,
}

impl Default for FrameStatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStatsAccumulator {
    /// Creates a new accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames_recorded: 0,
            spawned_sum: 0,
            pooled_sum: 0,
            evicted_sum: 0,
            destroyed_sum: 0,
            peak_live: 0,
            step_us_sum: 0,
            max_step_us: 0,
        }
    }

    /// Records a frame's statistics.
    pub fn record(&mut self, stats: FrameStats) {
        self.frames_recorded += 1;
        self.spawned_sum += u64::from(stats.spawned);
        self.pooled_sum += u64::from(stats.pooled);
        self.evicted_sum += u64::from(stats.evicted);
        self.destroyed_sum += u64::from(stats.destroyed);
        self.peak_live = self.peak_live.max(stats.live_entities);
        self.step_us_sum += stats.step_us;
        self.max_step_us = self.max_step_us.max(stats.step_us);
    }

    /// Returns average step time in microseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_step_us(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.step_us_sum as f64 / self.frames_recorded as f64
    }
}

/// The frame loop orchestrator.
///
/// Owns the pool manager (and through it the host) plus the auto-return
/// countdowns, and advances them one fixed step at a time.
pub struct SimLoop {
    /// Pool manager bound to the simulated host.
    pools: PoolManager<SimHost>,
    /// Armed auto-return countdowns.
    timers: AutoReturnSet<EntityId>,
    /// Auto-return delay per category, from the templates.
    lifetimes: HashMap<CategoryKey, f32>,
    /// Frame counter.
    frame_count: u64,
    /// Counters for the frame in progress.
    pending: FrameStats,
    /// Accumulated frame statistics.
    stats: FrameStatsAccumulator,
}

impl SimLoop {
    /// Builds the host and pool manager from `config` and warms the presets.
    ///
    /// # Errors
    ///
    /// Configuration errors, or a factory failure while warming presets.
    pub fn new(config: &SimConfig) -> SimResult<Self> {
        config.validate()?;
        let host = SimHost::from_config(config)?;
        let lifetimes = config
            .templates
            .iter()
            .filter_map(|t| t.lifetime_secs.map(|secs| (t.category.clone(), secs)))
            .collect();

        let mut pools = PoolManager::new(host, config.pools.clone());
        pools.initialize()?;

        Ok(Self {
            pools,
            timers: AutoReturnSet::new(),
            lifetimes,
            frame_count: 0,
            pending: FrameStats::default(),
            stats: FrameStatsAccumulator::new(),
        })
    }

    /// Hands out an instance of `category`, armed with the template's
    /// lifetime if it has one.
    ///
    /// # Errors
    ///
    /// The host's factory failure when the pool has to grow.
    pub fn spawn(&mut self, category: &CategoryKey) -> SimResult<EntityId> {
        let lifetime = self.lifetimes.get(category).copied();
        let id = self.pools.get_pooled_object(category)?;
        if let Some(secs) = lifetime {
            self.timers.arm(&self.pools, id, secs);
        }
        self.pending.spawned += 1;
        Ok(id)
    }

    /// Hands out an instance of `category` that auto-returns after `secs`.
    ///
    /// # Errors
    ///
    /// The host's factory failure when the pool has to grow.
    pub fn spawn_with_lifetime(&mut self, category: &CategoryKey, secs: f32) -> SimResult<EntityId> {
        let id = self.pools.get_pooled_object(category)?;
        self.timers.arm(&self.pools, id, secs);
        self.pending.spawned += 1;
        Ok(id)
    }

    /// Returns an instance early, cancelling its countdown.
    pub fn despawn(&mut self, id: EntityId) -> ReturnOutcome {
        self.timers.cancel(&id);
        let outcome = self.pools.return_by_handle(id);
        self.pending.record(outcome);
        outcome
    }

    /// Advances the simulation by `delta_time` seconds and closes the frame.
    pub fn step(&mut self, delta_time: f32) -> FrameStats {
        let start = Instant::now();

        for (_, outcome) in self.timers.tick(delta_time, &mut self.pools) {
            self.pending.record(outcome);
        }

        let mut stats = std::mem::take(&mut self.pending);
        stats.frame = self.frame_count;
        stats.live_entities = self.pools.host().live_count();
        stats.step_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        self.frame_count += 1;
        self.stats.record(stats);

        if start.elapsed() > TARGET_FRAME_TIME {
            tracing::warn!(frame = stats.frame, step_us = stats.step_us, "step exceeded frame budget");
        }
        stats
    }

    /// Returns every live instance to its pool and drops all countdowns.
    ///
    /// Used between levels. Returns the number of instances returned.
    pub fn reset(&mut self) -> usize {
        self.timers.clear();
        self.pools.return_all_pooled_objects()
    }

    /// Begins shutdown and tears down the pools without touching the host.
    pub fn shutdown(&mut self) {
        self.timers.clear();
        self.pools.begin_shutdown();
        self.pools.cleanup_pools();
    }

    /// Returns the current frame count.
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Returns the pool manager.
    #[inline]
    #[must_use]
    pub const fn pools(&self) -> &PoolManager<SimHost> {
        &self.pools
    }

    /// Returns the pool manager mutably.
    #[inline]
    pub fn pools_mut(&mut self) -> &mut PoolManager<SimHost> {
        &mut self.pools
    }

    /// Returns the armed countdowns.
    #[inline]
    #[must_use]
    pub const fn timers(&self) -> &AutoReturnSet<EntityId> {
        &self.timers
    }

    /// Returns the accumulated statistics.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TemplateConfig;
    use recycle_core::{PoolManagerConfig, PoolPreset};

    fn config() -> SimConfig {
        SimConfig {
            templates: vec![
                TemplateConfig {
                    category: CategoryKey::new("Bullet"),
                    name: "Bullet".to_owned(),
                    lifetime_secs: Some(1.0),
                },
                TemplateConfig {
                    category: CategoryKey::new("Crate"),
                    name: "Crate".to_owned(),
                    lifetime_secs: None,
                },
            ],
            pools: PoolManagerConfig::default().with_preset(PoolPreset::new("Bullet", 4, 8)),
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_spawned_bullet_returns_after_lifetime() {
        let mut sim = SimLoop::new(&config()).unwrap();
        let bullet = CategoryKey::new("Bullet");
        let id = sim.spawn(&bullet).unwrap();

        assert_eq!(sim.step(0.4).pooled, 0);
        assert_eq!(sim.step(0.4).pooled, 0);
        let third = sim.step(0.4);
        assert_eq!(third.pooled, 1);
        assert_eq!(third.frame, 2);

        assert!(sim.pools().is_idle(&bullet, &id));
        assert!(sim.timers().is_empty());
    }

    #[test]
    fn test_no_lifetime_stays_out() {
        let mut sim = SimLoop::new(&config()).unwrap();
        let crate_key = CategoryKey::new("Crate");
        let id = sim.spawn(&crate_key).unwrap();

        for _ in 0..100 {
            sim.step(1.0);
        }
        assert!(sim.pools().is_checked_out(&crate_key, &id));
        assert_eq!(sim.despawn(id), ReturnOutcome::Pooled);
    }

    #[test]
    fn test_despawn_cancels_timer() {
        let mut sim = SimLoop::new(&config()).unwrap();
        let id = sim.spawn(&CategoryKey::new("Bullet")).unwrap();

        assert_eq!(sim.despawn(id), ReturnOutcome::Pooled);
        assert!(!sim.timers().is_armed(&id));
        let frame = sim.step(5.0);
        assert_eq!(frame.pooled, 1);
        assert_eq!(sim.pools().anomalies().len(), 0);
    }

    #[test]
    fn test_reset_returns_everything() {
        let mut sim = SimLoop::new(&config()).unwrap();
        let bullet = CategoryKey::new("Bullet");
        for _ in 0..3 {
            sim.spawn(&bullet).unwrap();
        }
        sim.spawn(&CategoryKey::new("Crate")).unwrap();

        assert_eq!(sim.reset(), 4);
        assert_eq!(sim.pools().active_count(&bullet), Some(0));
        assert!(sim.timers().is_empty());
    }

    #[test]
    fn test_unknown_template_propagates() {
        let mut sim = SimLoop::new(&config()).unwrap();
        assert!(sim.spawn(&CategoryKey::new("Ghost")).is_err());
    }

    #[test]
    fn test_shutdown_leaves_host_untouched() {
        let mut sim = SimLoop::new(&config()).unwrap();
        let live = sim.pools().host().live_count();

        sim.shutdown();

        assert_eq!(sim.pools().categories().count(), 0);
        assert_eq!(sim.pools().host().live_count(), live);
    }

    #[test]
    fn test_accumulator() {
        let mut sim = SimLoop::new(&config()).unwrap();
        sim.spawn(&CategoryKey::new("Bullet")).unwrap();
        sim.step(2.0);
        sim.step(2.0);

        let stats = sim.stats();
        assert_eq!(stats.frames_recorded, 2);
        assert_eq!(stats.spawned_sum, 1);
        assert_eq!(stats.pooled_sum, 1);
        assert!(stats.peak_live >= 4);
    }

    #[test]
    fn test_early_return_does_not_recall_next_holder() {
        let mut sim = SimLoop::new(&config()).unwrap();
        let crate_key = CategoryKey::new("Crate");
        let first = sim.spawn_with_lifetime(&crate_key, 1.0).unwrap();

        assert_eq!(sim.pools_mut().return_by_handle(first), ReturnOutcome::Pooled);
        let second = sim.spawn(&crate_key).unwrap();
        assert_eq!(first, second);

        let frame = sim.step(1.0);
        assert_eq!(frame.pooled, 0);
        assert!(sim.pools().is_checked_out(&crate_key, &second));
        assert!(sim.timers().is_empty());
        assert_eq!(sim.pools().anomalies().len(), 0);
    }
}
