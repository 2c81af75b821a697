use packed_entities::{AttrStore, AttrStoreBuilder, AttrType, Shard, ShardEncoding, ShardError, Value, SHARD_SIZE};

fn long_column(values: &[Option<i64>]) -> AttrStoreBuilder {
    let mut col = AttrStoreBuilder::new(AttrType::Long);
    for v in values {
        col.add(v.map(Value::Long).as_ref()).unwrap();
    }
    col
}

#[test]
fn empty_column_builds() {
    let store = AttrStoreBuilder::new(AttrType::Double).build();
    assert!(store.is_empty());
    assert!(store.shards().is_empty());
    assert_eq!(store.get(0), None);
    assert!(store.is_null(0));
}

#[test]
fn skip_records_absent_rows() {
    let mut col = AttrStoreBuilder::new(AttrType::Text);
    col.add(Some(&Value::from("a"))).unwrap();
    col.skip().unwrap();
    col.add(Some(&Value::from("c"))).unwrap();
    assert_eq!(col.len(), 3);

    let store = col.build();
    let rows: Vec<Option<Value>> = store.iter().collect();
    assert_eq!(rows, vec![Some(Value::from("a")), None, Some(Value::from("c"))]);
}

#[test]
fn rows_span_several_shards() {
    let n = 2 * SHARD_SIZE + 17;
    let mut col = AttrStoreBuilder::new(AttrType::Long);
    for i in 0..n {
        if i % 5 == 0 {
            col.skip().unwrap();
        } else {
            col.add(Some(&Value::Long(i as i64))).unwrap();
        }
    }
    let store = col.build();
    assert_eq!(store.len(), n);
    assert_eq!(store.shards().len(), 3);
    assert_eq!(store.shards()[0].len(), SHARD_SIZE);
    assert_eq!(store.shards()[2].len(), 17);
    for i in [0, 1, SHARD_SIZE - 1, SHARD_SIZE, SHARD_SIZE + 1, n - 1] {
        let expected = if i % 5 == 0 { None } else { Some(i as i64) };
        assert_eq!(store.get_long(i), expected, "row {i}");
    }
}

#[test]
fn promotion_is_per_shard() {
    let mut col = AttrStoreBuilder::new(AttrType::Long);
    for i in 0..SHARD_SIZE {
        col.add(Some(&Value::Long(i as i64 % 100))).unwrap();
    }
    col.add(Some(&Value::Long(5_000_000_000))).unwrap();
    assert_eq!(col.encodings(), vec![ShardEncoding::LongI16, ShardEncoding::LongI64]);
}

#[test]
fn set_overwrites_and_clears() {
    let mut col = long_column(&[Some(1), Some(2), Some(3)]);
    col.set(1, Some(&Value::Long(100_000))).unwrap();
    col.set(2, None).unwrap();
    assert_eq!(col.get(1), Some(Value::Long(100_000)));
    assert!(col.is_null(2));
    assert_eq!(col.encodings(), vec![ShardEncoding::LongI32]);

    let err = col.set(3, Some(&Value::Long(4))).unwrap_err();
    assert!(matches!(err, ShardError::SlotOutOfRange(_)));
}

#[test]
fn swap_exchanges_values_and_presence() {
    let mut col = long_column(&[Some(1), None, Some(3)]);
    col.swap(0, 1).unwrap();
    assert_eq!(col.get(0), None);
    assert_eq!(col.get(1), Some(Value::Long(1)));
    assert_eq!(col.get(2), Some(Value::Long(3)));

    col.swap(2, 2).unwrap();
    assert_eq!(col.get(2), Some(Value::Long(3)));
}

#[test]
fn swap_across_shards_promotes_the_receiving_shard() {
    let mut col = AttrStoreBuilder::new(AttrType::Double);
    for _ in 0..SHARD_SIZE {
        col.add(Some(&Value::Double(1.0))).unwrap();
    }
    col.add(Some(&Value::Double(0.1))).unwrap();
    assert_eq!(col.encodings(), vec![ShardEncoding::DoubleHalf, ShardEncoding::DoubleF64]);

    col.swap(0, SHARD_SIZE).unwrap();
    assert_eq!(col.get(0), Some(Value::Double(0.1)));
    assert_eq!(col.get(SHARD_SIZE), Some(Value::Double(1.0)));
    assert_eq!(col.encodings(), vec![ShardEncoding::DoubleF64, ShardEncoding::DoubleF64]);
}

#[test]
fn swap_out_of_range_is_rejected() {
    let mut col = long_column(&[Some(1)]);
    assert!(col.swap(0, 1).is_err());
    assert_eq!(col.get(0), Some(Value::Long(1)));
}

#[test]
fn mismatched_add_leaves_column_unchanged() {
    let mut col = long_column(&[Some(1)]);
    assert!(col.add(Some(&Value::Double(1.0))).is_err());
    assert_eq!(col.len(), 1);
    col.add(Some(&Value::Long(2))).unwrap();
    assert_eq!(col.build().get(1), Some(Value::Long(2)));
}

#[test]
fn temp_build_leaves_builder_usable() {
    let mut col = long_column(&[Some(1), Some(2)]);
    let snapshot = col.temp_build();
    col.add(Some(&Value::Long(3))).unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(col.len(), 3);
    assert_eq!(col.build().get(2), Some(Value::Long(3)));
}

#[test]
fn numeric_reads_decode_every_encoding() {
    let mut col = AttrStoreBuilder::new(AttrType::Int);
    col.add(Some(&Value::Int(-7))).unwrap();
    col.skip().unwrap();
    let store = col.build();
    assert_eq!(store.get_f64(0), Some(-7.0));
    assert_eq!(store.get_f64(1), None);
    assert_eq!(store.get_long(0), Some(-7));
}

#[test]
fn hand_assembled_column_is_accepted() {
    let mut shard = Shard::create(AttrType::Long);
    shard.put(0, Some(&Value::Long(9))).unwrap();
    let store = AttrStore::new(AttrType::Long, vec![shard], 1);
    assert_eq!(store.get(0), Some(Value::Long(9)));
}

#[test]
#[should_panic(expected = "only the last shard may be partial")]
fn partial_inner_shard_panics() {
    let mut first = Shard::create(AttrType::Long);
    first.put(0, Some(&Value::Long(1))).unwrap();
    let mut second = Shard::create(AttrType::Long);
    second.put(0, Some(&Value::Long(2))).unwrap();
    let _ = AttrStore::new(AttrType::Long, vec![first, second], 2);
}

#[test]
#[should_panic(expected = "column declares")]
fn wrong_declared_size_panics() {
    let mut shard = Shard::create(AttrType::Long);
    shard.put(0, Some(&Value::Long(1))).unwrap();
    let _ = AttrStore::new(AttrType::Long, vec![shard], 5);
}
