mod common;

use common::*;
use packed_entities::prelude::*;
use packed_entities::reduce::{Accumulator, Count, MinMax, Sum, Welford};
use packed_entities::{SchemaError, SHARD_SIZE};

fn spread(n: i64) -> PackedEntityCollection {
    let entities: Vec<BasicEntity> = (0..n)
        .map(|i| {
            if i % 4 == 3 {
                tagged_entity(i, i, "skip")
            } else {
                rating_entity(i, i, i % 9, (i % 11) as f64 * 0.5 + if i % 13 == 0 { 0.1 } else { 0.0 })
            }
        })
        .collect();
    build_packed(&entities, &[])
}

fn present_ratings(collection: &PackedEntityCollection) -> Vec<f64> {
    collection.iter().filter_map(|r| r.double_value("rating").ok()).collect()
}

#[test]
fn stock_accumulators_match_a_row_scan() {
    let collection = spread(3 * SHARD_SIZE as i64 + 5);
    let values = present_ratings(&collection);

    let count: Count = collection.summarize("rating").unwrap();
    assert_eq!(count.0, values.len() as u64);

    let bounds: MinMax = collection.summarize("rating").unwrap();
    assert_eq!(bounds.min, values.iter().copied().fold(f64::INFINITY, f64::min));
    assert_eq!(bounds.max, values.iter().copied().fold(f64::NEG_INFINITY, f64::max));

    let sum: Sum = collection.summarize("rating").unwrap();
    let expected: f64 = values.iter().sum();
    assert!((sum.0 - expected).abs() < 1e-6 * expected.abs().max(1.0));

    let stats: Welford = collection.summarize("rating").unwrap();
    let mean = expected / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    assert_eq!(stats.n, values.len() as u64);
    assert!((stats.mean - mean).abs() < 1e-9);
    assert!((stats.variance() - var).abs() < 1e-6);
}

#[test]
fn reductions_are_deterministic() {
    let collection = spread(2 * SHARD_SIZE as i64 + 100);
    let first: Sum = collection.summarize("rating").unwrap();
    for _ in 0..5 {
        let again: Sum = collection.summarize("rating").unwrap();
        assert_eq!(first.0.to_bits(), again.0.to_bits());
    }
}

#[test]
fn integer_columns_reduce_as_doubles() {
    let collection = build_packed(&[rating_entity(1, 10, 3, 1.0), rating_entity(2, 20, 4, 1.0)], &[]);
    let total = collection
        .reduce_column("user", || 0.0, |acc, v| *acc += v, |a, b| *a += b)
        .unwrap();
    assert_eq!(total, 30.0);

    let items: MinMax = collection.summarize("item").unwrap();
    assert_eq!((items.min, items.max), (3.0, 4.0));
}

#[test]
fn empty_columns_reduce_to_the_initial_value() {
    let collection = build_packed(&[tagged_entity(1, 1, "a")], &[]);
    let count: Count = collection.summarize("rating").unwrap();
    assert_eq!(count, Count(0));
    let bounds: MinMax = collection.summarize("rating").unwrap();
    assert!(bounds.min > bounds.max);
    let stats: Welford = collection.summarize("rating").unwrap();
    assert_eq!(stats.variance(), 0.0);
}

#[test]
fn non_numeric_and_unknown_columns_are_errors() {
    let collection = build_packed(&[tagged_entity(1, 1, "a")], &[]);
    assert!(matches!(
        collection.summarize::<Count>("tag"),
        Err(StoreError::Schema(SchemaError::ValueType { actual: AttrType::Text, .. }))
    ));
    assert_eq!(
        collection.summarize::<Count>("genre"),
        Err(StoreError::NoSuchAttribute("genre".into()))
    );
}

#[test]
fn welford_partials_combine_like_one_pass() {
    let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
    let mut whole = Welford::default();
    values.iter().for_each(|&v| whole.push(v));

    let mut left = Welford::default();
    let mut right = Welford::default();
    values[..3].iter().for_each(|&v| left.push(v));
    values[3..].iter().for_each(|&v| right.push(v));
    left.combine(right);

    assert_eq!(left.n, whole.n);
    assert!((left.mean - 5.0).abs() < 1e-12);
    assert!((left.variance() - whole.variance()).abs() < 1e-12);

    let mut empty = Welford::default();
    empty.combine(whole);
    assert_eq!(empty, whole);
}
