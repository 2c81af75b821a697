#![allow(dead_code)]

use packed_entities::prelude::*;
use packed_entities::common::{item, rating, user};

pub const ROWS_SMALL: i64 = 10_000;
pub const ROWS_MED: i64 = 100_000;
pub const ROWS_LARGE: i64 = 1_000_000;

pub const USERS: i64 = 1_000;

pub fn rating_type() -> EntityType {
    EntityType::new("rating")
}

pub fn rating_attrs() -> AttributeSet {
    AttributeSet::create([user(), item(), rating()]).unwrap()
}

/// Rating-shaped rows; every 17th carries a rating off the half-step grid
/// so double shards promote.
pub fn make_ratings(count: i64) -> Vec<BasicEntity> {
    (0..count)
        .map(|i| {
            let value = if i % 17 == 0 { 3.3 } else { (i % 10) as f64 * 0.5 };
            BasicEntity::builder(rating_type(), i)
                .with(user(), i % USERS).unwrap()
                .with(item(), (i * 7919) % 50_000).unwrap()
                .with(rating(), value).unwrap()
                .build()
                .unwrap()
        })
        .collect()
}

/// Same rows, ids reversed in blocks so the builder has to sort.
pub fn shuffle_blocks(mut rows: Vec<BasicEntity>, block: usize) -> Vec<BasicEntity> {
    for chunk in rows.chunks_mut(block) {
        chunk.reverse();
    }
    rows
}

pub fn pack(rows: &[BasicEntity], indexed: &[&str], config: PackConfig) -> PackedEntityCollection {
    let mut builder = PackedEntityCollectionBuilder::new(rating_type(), rating_attrs()).with_config(config);
    for name in indexed {
        builder.add_index(name);
    }
    for row in rows {
        builder.add(row, false).unwrap();
    }
    builder.build().unwrap()
}
