use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;
use tokio::runtime::Runtime;

use hazard_core::{CounterMap, SharedMap, WorkerPool};

fn counter_increment_benchmark(c: &mut Criterion) {
    let counters = CounterMap::with_capacity(1000);
    for i in 0..1000 {
        counters.get_or_create_counter(&format!("item{}", i));
    }

    c.bench_function("get_or_create_hit_increment", |b| {
        b.iter(|| {
            counters
                .get_or_create_counter(black_box("item500"))
                .increment();
        });
    });
}

fn put_all_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_all_sizes");

    for size in [10usize, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let map = SharedMap::with_capacity(size);
                map.put_all((0..size).map(|i| (format!("k{}", i), i as u64)));
                black_box(map.len())
            });
        });
    }

    group.finish();
}

fn pool_batch_benchmark(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let pool: WorkerPool = WorkerPool::new(4).unwrap();

    c.bench_function("pool_batch_1000_items", |b| {
        b.to_async(&rt).iter(|| async {
            let outcome = pool
                .submit_and_await(0..1000u64, |_, i| i, Duration::from_secs(10))
                .await
                .unwrap();
            black_box(outcome.dispatched)
        });
    });
}

criterion_group!(
    benches,
    counter_increment_benchmark,
    put_all_benchmark,
    pool_batch_benchmark
);
criterion_main!(benches);
