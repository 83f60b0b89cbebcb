//! Integration tests for pool invariants against the simulated host.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use recycle_sim::core::{
    Anomaly, AutoReturn, CategoryKey, PoolManager, PoolManagerConfig, ReturnOutcome,
};
use recycle_sim::{SimConfig, SimHost, SimLoop, TemplateConfig};

fn template(name: &str) -> TemplateConfig {
    TemplateConfig {
        category: CategoryKey::new(name),
        name: name.to_owned(),
        lifetime_secs: None,
    }
}

fn manager() -> PoolManager<SimHost> {
    let mut host = SimHost::new(10_000);
    for name in ["Bullet", "Enemy", "Spark"] {
        host.register_template(template(name)).unwrap();
    }
    PoolManager::new(host, PoolManagerConfig::default())
}

#[test]
fn test_free_list_never_exceeds_max() {
    let mut pools = manager();
    let spark = CategoryKey::new("Spark");
    pools.create_pool(spark.clone(), 2, 8).unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut out = Vec::new();

    for _ in 0..2_000 {
        if !out.is_empty() && rng.gen_bool(0.5) {
            let index = rng.gen_range(0..out.len());
            let instance = out.swap_remove(index);
            let outcome = pools.return_by_handle(instance);
            assert!(matches!(outcome, ReturnOutcome::Pooled | ReturnOutcome::Evicted));
        } else {
            out.push(pools.get_pooled_object(&spark).unwrap());
        }

        let idle = pools.idle_count(&spark).unwrap();
        let active = pools.active_count(&spark).unwrap();
        assert!(idle <= 8);
        assert_eq!(active, out.len());
        assert_eq!(pools.host().live_count(), idle + active);
    }

    for instance in &out {
        assert!(pools.is_checked_out(&spark, instance));
        assert!(!pools.is_idle(&spark, instance));
        assert!(pools.host().is_active(*instance));
    }
    assert_eq!(pools.anomalies().len(), 0);
}

#[test]
fn test_round_trip_reuses_instance() {
    let mut pools = manager();
    let bullet = CategoryKey::new("Bullet");
    pools.create_pool(bullet.clone(), 1, 4).unwrap();

    let first = pools.get_pooled_object(&bullet).unwrap();
    assert_eq!(pools.return_by_handle(first), ReturnOutcome::Pooled);
    let second = pools.get_pooled_object(&bullet).unwrap();

    assert_eq!(first, second);
    assert_eq!(pools.host().counters().instantiated, 1);
}

#[test]
fn test_bullet_pool_lifecycle() {
    let mut pools = manager();
    let bullet = CategoryKey::new("Bullet");
    pools.create_pool(bullet.clone(), 5, 10).unwrap();

    assert_eq!(pools.idle_count(&bullet), Some(5));
    assert_eq!(pools.host().live_count(), 5);
    assert_eq!(pools.host().active_count(), 0);
    assert_eq!(pools.host().holding_area_count(), 1);

    let out: Vec<_> = (0..3)
        .map(|_| pools.get_pooled_object(&bullet).unwrap())
        .collect();
    assert_eq!(pools.idle_count(&bullet), Some(2));
    assert_eq!(pools.active_count(&bullet), Some(3));
    for id in &out {
        let object = pools.host().get(*id).unwrap();
        assert!(object.active);
        assert_eq!(object.parent, None);
    }

    assert_eq!(pools.return_by_handle(out[0]), ReturnOutcome::Pooled);
    assert_eq!(pools.idle_count(&bullet), Some(3));
    let object = pools.host().get(out[0]).unwrap();
    assert!(!object.active);
    let holding = object.parent.unwrap();
    assert_eq!(pools.host().holding_area_name(holding), Some("BulletPool"));
}

#[test]
fn test_eviction_when_free_list_full() {
    let mut pools = manager();
    let spark = CategoryKey::new("Spark");
    pools.create_pool(spark.clone(), 0, 2).unwrap();

    let out: Vec<_> = (0..3)
        .map(|_| pools.get_pooled_object(&spark).unwrap())
        .collect();
    let outcomes: Vec<_> = out.iter().map(|id| pools.return_by_handle(*id)).collect();

    assert_eq!(
        outcomes,
        vec![
            ReturnOutcome::Pooled,
            ReturnOutcome::Pooled,
            ReturnOutcome::Evicted
        ]
    );
    assert_eq!(pools.idle_count(&spark), Some(2));
    assert!(!pools.host().is_alive(out[2]));
    assert_eq!(pools.stats(&spark).unwrap().evicted, 1);
}

#[test]
fn test_double_release_is_absorbed() {
    let mut pools = manager();
    let bullet = CategoryKey::new("Bullet");
    pools.create_pool(bullet.clone(), 0, 4).unwrap();

    let id = pools.get_pooled_object(&bullet).unwrap();
    assert_eq!(pools.return_by_handle(id), ReturnOutcome::Pooled);
    assert_eq!(pools.return_by_handle(id), ReturnOutcome::AlreadyIdle);

    assert_eq!(pools.idle_count(&bullet), Some(1));
    assert!(matches!(
        pools.anomalies().last(),
        Some(Anomaly::DoubleRelease { .. })
    ));
}

#[test]
fn test_untracked_instance_without_handle_is_destroyed() {
    let mut pools = manager();
    let id = pools
        .host_mut()
        .spawn_untracked("Stray", CategoryKey::new("Bullet"))
        .unwrap();

    assert_eq!(pools.return_by_handle(id), ReturnOutcome::Destroyed);
    assert!(!pools.host().is_alive(id));
    assert!(matches!(
        pools.anomalies().last(),
        Some(Anomaly::MissingTrackingInfo { .. })
    ));
}

#[test]
fn test_destroy_unknown_pool_is_noop() {
    let mut pools = manager();
    pools.create_pool("Bullet", 2, 4).unwrap();

    pools.destroy_pool(&CategoryKey::new("Ghost"));

    assert_eq!(pools.categories().count(), 1);
    assert_eq!(pools.host().live_count(), 2);
    assert!(matches!(
        pools.anomalies().last(),
        Some(Anomaly::UnknownCategory {
            operation: "destroy_pool",
            ..
        })
    ));
}

#[test]
fn test_destroy_pool_releases_everything() {
    let mut pools = manager();
    let bullet = CategoryKey::new("Bullet");
    pools.create_pool(bullet.clone(), 2, 10).unwrap();
    let checked_out = pools.get_pooled_object(&bullet).unwrap();

    pools.destroy_pool(&bullet);

    assert!(!pools.contains_pool(&bullet));
    assert!(!pools.host().is_alive(checked_out));
    assert_eq!(pools.host().live_count(), 0);
    assert_eq!(pools.host().holding_area_count(), 0);
}

#[test]
fn test_return_all_across_categories() {
    let mut pools = manager();
    let bullet = CategoryKey::new("Bullet");
    let enemy = CategoryKey::new("Enemy");
    pools.create_pool(bullet.clone(), 2, 10).unwrap();
    pools.create_pool(enemy.clone(), 1, 10).unwrap();

    for _ in 0..3 {
        pools.get_pooled_object(&bullet).unwrap();
    }
    for _ in 0..2 {
        pools.get_pooled_object(&enemy).unwrap();
    }

    assert_eq!(pools.return_all_pooled_objects(), 5);
    assert_eq!(pools.active_count(&bullet), Some(0));
    assert_eq!(pools.active_count(&enemy), Some(0));
    assert_eq!(pools.idle_count(&bullet), Some(3));
    assert_eq!(pools.idle_count(&enemy), Some(2));
    assert_eq!(pools.host().active_count(), 0);
}

#[test]
fn test_auto_return_fires_once() {
    let mut timer = AutoReturn::new(1.0);

    assert!(!timer.tick(0.4));
    assert!(!timer.tick(0.4));
    assert!(timer.tick(0.4));
    assert!(!timer.tick(0.4));

    timer.on_activate();
    assert!(!timer.is_triggered());
    assert!(!timer.tick(0.4));
}

#[test]
fn test_timed_return_through_frame_loop() {
    let config = SimConfig {
        templates: vec![template("Bullet")],
        ..SimConfig::default()
    };
    let mut sim = SimLoop::new(&config).unwrap();
    let bullet = CategoryKey::new("Bullet");
    let id = sim.spawn_with_lifetime(&bullet, 1.0).unwrap();

    assert_eq!(sim.step(0.4).pooled, 0);
    assert!(sim.pools().is_checked_out(&bullet, &id));
    assert_eq!(sim.step(0.4).pooled, 0);
    assert_eq!(sim.step(0.4).pooled, 1);

    assert!(sim.pools().is_idle(&bullet, &id));
    assert!(!sim.pools().host().is_active(id));
}

#[test]
fn test_soak_config_steady_state() {
    let config = SimConfig::from_toml_str(include_str!("../config/pools.toml")).unwrap();
    let mut sim = SimLoop::new(&config).unwrap();
    let bullet = CategoryKey::new("Bullet");
    let delta_time = config.frame_time_secs();

    for _ in 0..600 {
        sim.spawn(&bullet).unwrap();
        sim.step(delta_time);
    }

    let stats = sim.pools().stats(&bullet).unwrap();
    assert!(stats.idle <= stats.max_size);
    assert!(stats.active <= 62);
    assert_eq!(stats.evicted, 0);
    assert!(stats.created <= 64);
    assert_eq!(sim.pools().anomalies().len(), 0);
}
