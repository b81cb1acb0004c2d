//! Sequence engine benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use seqgen_bench::{random_keys, temp_engine};

/// Benchmark `get` on one hot key.
fn bench_hot_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_hot_key");
    group.throughput(Throughput::Elements(1));

    for sync in [false, true] {
        group.bench_with_input(BenchmarkId::new("sync_on_write", sync), &sync, |b, &sync| {
            let (_dir, engine) = temp_engine(|c| c.sync_on_write(sync));
            b.iter(|| black_box(engine.get("hot").unwrap()));
        });
    }
    group.finish();
}

/// Benchmark `get` spread over many keys.
fn bench_many_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_many_keys");
    group.throughput(Throughput::Elements(1));

    for key_count in [100, 10_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(key_count),
            &key_count,
            |b, &key_count| {
                let (_dir, engine) = temp_engine(|c| c);
                let keys = random_keys(key_count, 16);
                let mut rng = rand::thread_rng();

                b.iter(|| {
                    let key = &keys[rng.gen_range(0..keys.len())];
                    black_box(engine.get(key).unwrap())
                });
            },
        );
    }
    group.finish();
}

/// Benchmark `get` through segment rotation and background snapshots.
fn bench_rotation(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_with_rotation");
    group.throughput(Throughput::Elements(1));

    for max_records in [100, 1_000, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("max_log_records", max_records),
            &max_records,
            |b, &max_records| {
                let (_dir, engine) = temp_engine(|c| c.max_log_records(max_records));
                let keys = random_keys(1_000, 16);
                let mut next = 0;

                b.iter(|| {
                    next = (next + 1) % keys.len();
                    black_box(engine.get(&keys[next]).unwrap())
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_hot_key, bench_many_keys, bench_rotation);
criterion_main!(benches);
