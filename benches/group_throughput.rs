use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use asyncbatch::Group;

/// Submit a fixed number of items and close, for several flush thresholds
fn submit_and_close_benchmark(c: &mut Criterion) {
    const ITEMS: u64 = 10_000;
    let mut group = c.benchmark_group("submit_and_close");
    group.throughput(Throughput::Elements(ITEMS));

    for size in [16usize, 64, 512].iter() {
        group.bench_with_input(BenchmarkId::new("size", size), size, |b, &size| {
            b.iter(|| {
                let batcher = Group::builder()
                    .size(size)
                    .interval(Duration::from_millis(50))
                    .handler(|batch: Vec<u64>| {
                        black_box(batch);
                    })
                    .build()
                    .expect("Failed to create group");

                for i in 0..ITEMS {
                    batcher.submit(i).expect("group is open");
                }
                batcher.close().expect("first close succeeds");
            });
        });
    }

    group.finish();
}

/// Cost of a single submit against a long-lived group
fn single_submit_benchmark(c: &mut Criterion) {
    let batcher = Group::builder()
        .size(1024)
        .interval(Duration::from_millis(10))
        .handler(|batch: Vec<u64>| {
            black_box(batch);
        })
        .build()
        .expect("Failed to create group");

    c.bench_function("single_submit", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            batcher.submit(black_box(i)).expect("group is open");
        });
    });

    batcher.close().expect("first close succeeds");
}

criterion_group!(benches, submit_and_close_benchmark, single_submit_benchmark);
criterion_main!(benches);
