//! Throughput of a full cache under churn, per eviction strategy.
//!
//! Every put past the first `CAPACITY` keys forces an eviction, so this
//! mostly measures victim selection.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use perfcore::domain::models::{CacheProfile, EvictionStrategy};
use perfcore::services::Cache;

const CAPACITY: usize = 512;
const OPERATIONS: usize = 4_096;
const STRATEGIES: [EvictionStrategy; 4] = [
    EvictionStrategy::Lru,
    EvictionStrategy::Lfu,
    EvictionStrategy::Ttl,
    EvictionStrategy::Adaptive,
];

fn churn(strategy: EvictionStrategy) -> u64 {
    let mut cache: Cache<u64> = Cache::new("bench", CacheProfile::new(strategy, CAPACITY));

    for i in 0..OPERATIONS {
        let key = format!("k{}", i % (CAPACITY * 2));
        if cache.get(&key).is_none() {
            cache.put(key, i as u64, None);
        }
        // keep a hot subset so frequency-aware strategies have something to protect
        black_box(cache.get(&format!("k{}", i % 32)));
    }

    cache.metrics().evictions
}

fn eviction_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_churn");
    group.throughput(Throughput::Elements(OPERATIONS as u64));

    for strategy in STRATEGIES {
        group.bench_with_input(
            BenchmarkId::from_parameter(strategy),
            &strategy,
            |b, &strategy| b.iter(|| churn(black_box(strategy))),
        );
    }

    group.finish();
}

criterion_group!(eviction_benches, eviction_benchmarks);
criterion_main!(eviction_benches);
