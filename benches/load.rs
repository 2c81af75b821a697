use criterion::*;
use std::hint::black_box;

mod common;
use common::*;

use packed_entities::prelude::*;

fn load_benchmark(c: &mut Criterion) {
    let sorted = make_ratings(ROWS_MED);
    let shuffled = shuffle_blocks(sorted.clone(), 4096);

    let mut group = c.benchmark_group("load");
    group.throughput(Throughput::Elements(ROWS_MED as u64));

    group.bench_function("packed_sorted_100k", |b| {
        b.iter(|| black_box(pack(&sorted, &[], PackConfig::default())));
    });

    group.bench_function("packed_shuffled_100k", |b| {
        b.iter(|| black_box(pack(&shuffled, &[], PackConfig::default())));
    });

    group.bench_function("packed_indexed_parallel_100k", |b| {
        b.iter(|| black_box(pack(&sorted, &["user", "item", "rating"], PackConfig::default())));
    });

    group.bench_function("packed_indexed_sequential_100k", |b| {
        b.iter(|| black_box(pack(&sorted, &["user", "item", "rating"], PackConfig::sequential())));
    });

    group.bench_function("map_indexed_100k", |b| {
        b.iter_batched(
            || EntityCollectionBuilder::new(rating_type()),
            |mut builder| {
                builder.add_index("user");
                builder.add_all(&sorted).unwrap();
                black_box(builder.build().unwrap());
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, load_benchmark);
criterion_main!(benches);
