//! Throughput Benchmark for cookiekv
//!
//! Every operation loads and saves the whole collection, so cost grows with
//! the number of stored entries. These benchmarks measure that at a few
//! realistic jar sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cookiekv::{Collection, EntryStore};

const JAR_SIZES: [usize; 3] = [10, 100, 1_000];

fn filled_store(entries: usize) -> EntryStore {
    let store = EntryStore::in_memory();
    for i in 0..entries {
        store.write_with_ttl(&format!("cookie:{}", i), &format!("value:{}", i), 3600);
    }
    store
}

/// Benchmark write operations
fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");
    group.throughput(Throughput::Elements(1));

    for size in JAR_SIZES {
        let store = filled_store(size);
        group.bench_with_input(BenchmarkId::new("overwrite", size), &size, |b, &size| {
            let mut i = 0usize;
            b.iter(|| {
                store.write(&format!("cookie:{}", i % size), "fresh");
                i += 1;
            });
        });
    }

    group.bench_function("append_from_empty", |b| {
        b.iter(|| {
            let store = EntryStore::in_memory();
            for i in 0..50 {
                store.write(&format!("cookie:{}", i), "value");
            }
            black_box(store);
        });
    });

    group.finish();
}

/// Benchmark read operations
fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    group.throughput(Throughput::Elements(1));

    for size in JAR_SIZES {
        let store = filled_store(size);
        group.bench_with_input(BenchmarkId::new("hit", size), &size, |b, &size| {
            let mut i = 0usize;
            b.iter(|| {
                black_box(store.read(&format!("cookie:{}", i % size)));
                i += 1;
            });
        });
        group.bench_with_input(BenchmarkId::new("miss", size), &size, |b, _| {
            b.iter(|| black_box(store.read("missing")));
        });
    }

    group.finish();
}

/// Benchmark list, which re-reads every entry
fn bench_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("list");

    for size in [10, 100] {
        let store = filled_store(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(store.list()));
        });
    }

    group.finish();
}

/// Benchmark raw blob decoding
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for size in JAR_SIZES {
        let blob = filled_store(size).snapshot().encode().unwrap();
        group.throughput(Throughput::Bytes(blob.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &blob, |b, blob| {
            b.iter(|| black_box(Collection::decode(blob).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_write, bench_read, bench_list, bench_decode);

criterion_main!(benches);
