//! Write log record and snapshot codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use seqgen_bench::random_keys;
use seqgen_core::{decode_table, encode_table, CounterTable, LogRecord};

fn bench_record_encode(c: &mut Criterion) {
    let record = LogRecord::new("orders-eu-west-1", 1_234_567_890);
    c.bench_function("record_encode", |b| b.iter(|| black_box(&record).encode()));
}

fn bench_record_parse(c: &mut Criterion) {
    let line = LogRecord::new("orders-eu-west-1", 1_234_567_890).encode();
    c.bench_function("record_parse", |b| {
        b.iter(|| LogRecord::parse(black_box(&line)).unwrap())
    });
}

fn bench_snapshot_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");
    let mut rng = rand::thread_rng();

    for key_count in [100, 10_000, 100_000] {
        let table: CounterTable = random_keys(key_count, 16)
            .into_iter()
            .map(|key| (key, rng.gen_range(1..1_000_000)))
            .collect();
        let encoded = encode_table(&table).unwrap();

        group.throughput(Throughput::Elements(key_count as u64));
        group.bench_with_input(BenchmarkId::new("encode", key_count), &table, |b, table| {
            b.iter(|| encode_table(black_box(table)).unwrap())
        });
        group.bench_with_input(
            BenchmarkId::new("decode", key_count),
            &encoded,
            |b, encoded| b.iter(|| decode_table(black_box(encoded)).unwrap()),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_record_encode, bench_record_parse, bench_snapshot_codec);
criterion_main!(benches);
