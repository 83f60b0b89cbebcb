//! # Pool Soak Run
//!
//! Drives the frame loop with a deterministic spawn workload and prints
//! pool statistics at the end. Every few seconds of simulated time the
//! level is reset, which hands every live instance back at once.
//!
//! Run with: cargo run --bin pool_soak -- [config.toml] [frames]

use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use recycle_sim::core::CategoryKey;
use recycle_sim::{SimConfig, SimError, SimLoop};

/// Built-in configuration used when no path is given.
const DEFAULT_CONFIG: &str = include_str!("../../config/pools.toml");

/// Default number of simulated frames (one minute at 60 FPS).
const DEFAULT_FRAMES: u64 = 3_600;

/// Frames between level resets.
const RESET_INTERVAL: u64 = 900;

/// Workload seed. Fixed so runs are comparable.
const SEED: u64 = 0x5EED_F00D;

/// Upper bound of spawns per frame for each category.
const SPAWN_RATES: [(&str, u32); 3] = [("Bullet", 6), ("Spark", 18), ("Debris", 1)];

fn main() -> Result<(), SimError> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => SimConfig::from_toml_file(path)?,
        None => SimConfig::from_toml_str(DEFAULT_CONFIG)?,
    };
    let frames = args
        .next()
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_FRAMES);

    let mut sim = SimLoop::new(&config)?;
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let delta_time = config.frame_time_secs();
    let categories: Vec<(CategoryKey, u32)> = SPAWN_RATES
        .iter()
        .map(|(name, rate)| (CategoryKey::new(name), *rate))
        .collect();

    println!("\n=== Pool Soak Run ===");
    println!("Frames: {frames} @ {} FPS", config.target_fps);

    let start = Instant::now();
    let mut spawn_failures = 0u64;
    let mut resets = 0u64;

    for frame in 0..frames {
        for (category, rate) in &categories {
            let count = rng.gen_range(0..=*rate);
            for _ in 0..count {
                if let Err(err) = sim.spawn(category) {
                    spawn_failures += 1;
                    if spawn_failures == 1 {
                        eprintln!("spawn failed at frame {frame}: {err}");
                    }
                }
            }
        }

        sim.step(delta_time);

        if frame > 0 && frame % RESET_INTERVAL == 0 {
            let returned = sim.reset();
            resets += 1;
            println!("Frame {frame}: level reset, {returned} instances returned");
        }
    }

    let elapsed = start.elapsed();
    let stats = sim.stats().clone();

    println!("\n--- Frames ---");
    println!("Simulated:      {}", stats.frames_recorded);
    println!("Wall time:      {:.2}ms", elapsed.as_secs_f64() * 1000.0);
    println!("Avg step:       {:.2}us", stats.avg_step_us());
    println!("Max step:       {}us", stats.max_step_us);
    println!("Resets:         {resets}");

    println!("\n--- Instances ---");
    println!("Spawned:        {}", stats.spawned_sum);
    println!("Pooled:         {}", stats.pooled_sum);
    println!("Evicted:        {}", stats.evicted_sum);
    println!("Destroyed:      {}", stats.destroyed_sum);
    println!("Spawn failures: {spawn_failures}");
    println!("Peak live:      {}", stats.peak_live);

    println!("\n--- Pools ---");
    let pools = sim.pools();
    let mut names: Vec<&CategoryKey> = pools.categories().collect();
    names.sort();
    for category in names {
        if let Some(pool) = pools.stats(category) {
            println!(
                "{category:<8} idle {:>4}/{:<4} active {:>4}  created {:>5}  evicted {:>5}  acquired {:>7}",
                pool.idle, pool.max_size, pool.active, pool.created, pool.evicted, pool.acquired
            );
        }
    }

    let counters = pools.host().counters();
    println!("\n--- Host ---");
    println!("Instantiated:   {}", counters.instantiated);
    println!("Destroyed:      {}", counters.destroyed);
    println!("Live:           {}", pools.host().live_count());

    let anomalies: Vec<String> = pools.anomalies().map(ToString::to_string).collect();
    println!("\n--- Anomalies ({}) ---", anomalies.len());
    for anomaly in &anomalies {
        println!("  {anomaly}");
    }

    sim.shutdown();
    Ok(())
}
