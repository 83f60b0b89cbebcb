//! Benchmark for pool churn.
//!
//! TARGET: acquire + return under 100ns once the pool is warm
//!
//! Run with: cargo bench --package recycle_core --bench pool_benchmark

use std::collections::HashMap;
use std::convert::Infallible;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use recycle_core::{
    CategoryKey, Instantiator, PoolManager, PoolManagerConfig, PoolPreset, RecycleHandle,
    SceneGraph,
};

/// Host whose objects are plain ids with a handle table.
#[derive(Default)]
struct BenchHost {
    next: u64,
    handles: HashMap<u64, RecycleHandle>,
}

impl Instantiator for BenchHost {
    type Instance = u64;
    type Error = Infallible;

    fn instantiate(&mut self, _category: &CategoryKey, _serial: usize) -> Result<u64, Infallible> {
        self.next += 1;
        Ok(self.next)
    }

    fn destroy(&mut self, instance: u64) {
        self.handles.remove(&instance);
    }

    fn set_active(&mut self, _instance: &u64, _active: bool) {}

    fn attach_handle(&mut self, instance: &u64, handle: RecycleHandle) {
        self.handles.insert(*instance, handle);
    }

    fn handle(&self, instance: &u64) -> Option<RecycleHandle> {
        self.handles.get(instance).cloned()
    }
}

impl SceneGraph<u64> for BenchHost {
    type Node = ();

    fn create_holding_area(&mut self, _category: &CategoryKey) {}

    fn destroy_holding_area(&mut self, _node: ()) {}

    fn set_parent(&mut self, _instance: &u64, _parent: Option<&()>) {}
}

fn warm_manager(initial: usize, max: usize) -> PoolManager<BenchHost> {
    let config = PoolManagerConfig::default().with_preset(PoolPreset::new("Bullet", initial, max));
    let mut pools = PoolManager::new(BenchHost::default(), config);
    pools.initialize().unwrap();
    pools
}

fn benchmark_acquire_release(c: &mut Criterion) {
    let mut pools = warm_manager(64, 64);
    let bullet = CategoryKey::new("Bullet");

    c.bench_function("acquire_release_by_key", |b| {
        b.iter(|| {
            let instance = pools.get_pooled_object(black_box(&bullet)).unwrap();
            black_box(pools.return_pooled_object(&bullet, instance))
        });
    });

    c.bench_function("acquire_release_by_handle", |b| {
        b.iter(|| {
            let instance = pools.get_pooled_object(black_box(&bullet)).unwrap();
            black_box(pools.return_by_handle(instance))
        });
    });
}

fn benchmark_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("burst");
    let burst = 1_000usize;
    group.throughput(Throughput::Elements(burst as u64));

    let mut pools = warm_manager(burst, burst);
    let bullet = CategoryKey::new("Bullet");

    group.bench_function("acquire_then_return_all", |b| {
        b.iter(|| {
            for _ in 0..burst {
                black_box(pools.get_pooled_object(&bullet).unwrap());
            }
            black_box(pools.return_all_pooled_objects())
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_acquire_release, benchmark_burst);
criterion_main!(benches);
