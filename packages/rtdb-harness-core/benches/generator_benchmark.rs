//! Generator and memory-store write throughput.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rtdb_harness_core::generator::{self, GeneratorConfig};
use rtdb_harness_core::writer::BatchWriter;
use rtdb_harness_core::{KeyPath, MemoryStore};
use std::hint::black_box;

fn config(record_count: usize) -> GeneratorConfig {
    GeneratorConfig {
        record_count,
        ..GeneratorConfig::default()
    }
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for count in [1_000usize, 10_000, 50_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let config = config(count);
            b.iter(|| black_box(generator::generate(&config).unwrap()));
        });
    }
    group.finish();
}

fn bench_write_all(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let chunk_set = generator::generate(&config(10_000)).unwrap();
    let collection = KeyPath::parse("transactions").unwrap();

    c.bench_function("write_all_10k", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let store = MemoryStore::new();
                let summary = BatchWriter::new(&store)
                    .write_all(&chunk_set.chunks)
                    .await
                    .unwrap();
                black_box(summary);
                black_box(store.get(&collection));
            })
        });
    });
}

criterion_group!(benches, bench_generate, bench_write_all);
criterion_main!(benches);
