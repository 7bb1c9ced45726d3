//! Benchmarks for archive production throughput.
//!
//! Measures traversal and encoding over the in-memory store across tree
//! shapes, compression levels and exclusion rule counts.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use s3zip_core::ArchiveConfig;
use s3zip_core::ArchiveProducer;
use s3zip_core::ExclusionMatcher;
use s3zip_core::MemoryStore;
use std::hint::black_box;

/// Creates a flat prefix with `count` objects of 1 KB each.
fn flat_store(count: usize) -> MemoryStore {
    let content = vec![b'x'; 1024];
    let mut store = MemoryStore::new("bench");
    for i in 0..count {
        store.insert(format!("flat/file_{i:05}.txt"), content.clone());
    }
    store
}

/// Creates a tree `depth` levels deep with `fanout` folders and one object
/// per folder.
fn nested_store(depth: usize, fanout: usize) -> MemoryStore {
    fn fill(store: &mut MemoryStore, prefix: &str, depth: usize, fanout: usize) {
        store.insert(format!("{prefix}data.bin"), vec![b'y'; 512]);
        if depth == 0 {
            return;
        }
        for i in 0..fanout {
            fill(store, &format!("{prefix}d{i}/"), depth - 1, fanout);
        }
    }

    let mut store = MemoryStore::new("bench");
    fill(&mut store, "tree/", depth, fanout);
    store
}

fn bench_flat(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_prefix");

    for count in [100, 1000] {
        let store = flat_store(count);
        group.throughput(Throughput::Bytes((count * 1024) as u64));

        for level in [0u8, 6] {
            let config = ArchiveConfig::new("bench").with_compression_level(level);
            group.bench_with_input(
                BenchmarkId::new(format!("level_{level}"), count),
                &config,
                |b, config| {
                    let producer = ArchiveProducer::new(&store, config).unwrap();
                    b.iter(|| {
                        let mut sink = Vec::with_capacity(count * 1200);
                        black_box(producer.produce_stream(&mut sink).unwrap())
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_prefixes");
    let store = nested_store(4, 4);
    let config = ArchiveConfig::new("bench").with_compression_level(0);
    let producer = ArchiveProducer::new(&store, &config).unwrap();

    group.bench_function("produce", |b| {
        b.iter(|| {
            let mut sink = Vec::new();
            black_box(producer.produce_stream(&mut sink).unwrap())
        });
    });
    group.bench_function("plan", |b| {
        b.iter(|| black_box(producer.plan().unwrap()));
    });

    group.finish();
}

fn bench_exclusion(c: &mut Criterion) {
    let mut group = c.benchmark_group("exclusion");
    let paths: Vec<String> = (0..1000)
        .map(|i| format!("data/{}/part-{i:05}.parquet", i % 17))
        .collect();

    for rules in [1usize, 10, 50] {
        let patterns: Vec<String> = (0..rules).map(|i| format!(r"^tmp{i}/|\.bak{i}$")).collect();
        let matcher = ExclusionMatcher::new(&patterns).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(rules), &matcher, |b, matcher| {
            b.iter(|| paths.iter().filter(|p| matcher.is_excluded(p)).count());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_flat, bench_nested, bench_exclusion);
criterion_main!(benches);
