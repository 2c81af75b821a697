//! Secondary indexes over packed columns.
//!
//! A [`PackIndex`] maps each value observed in one column to the ascending
//! list of row positions holding it. Long columns use a primitive-keyed map
//! so lookups never box the key; every other kind hashes [`Value`]s directly.
//!
//! Indexes are built once, by scanning a finished (id-sorted) column, and are
//! never mutated afterwards. Lookups are type-strict: probing a long index
//! with an `Int` value finds nothing.

use rustc_hash::FxHashMap;

use crate::engine::storage::AttrStore;
use crate::engine::types::{AttrType, RowID, Value};


/// Accumulates value → position lists before freezing them into a [`PackIndex`].
///
/// Positions must be added in ascending order; the builder keeps them in
/// arrival order.

#[derive(Debug)]
pub enum PackIndexBuilder {
    /// Hashed [`Value`] keys.
    Generic(FxHashMap<Value, Vec<RowID>>),
    /// Primitive `i64` keys.
    Long(FxHashMap<i64, Vec<RowID>>),
}

impl PackIndexBuilder {
    /// Picks the builder variant for a column of `kind`.
    pub fn for_kind(kind: AttrType) -> Self {
        match kind {
            AttrType::Long => PackIndexBuilder::Long(FxHashMap::default()),
            _ => PackIndexBuilder::Generic(FxHashMap::default()),
        }
    }

    /// Records that row `pos` holds `value`. A long builder ignores values
    /// of other kinds.
    pub fn add(&mut self, value: &Value, pos: RowID) {
        match (self, value) {
            (builder, Value::Long(v)) => builder.add_long(*v, pos),
            (PackIndexBuilder::Generic(map), value) => map.entry(value.clone()).or_default().push(pos),
            (PackIndexBuilder::Long(_), _) => {}
        }
    }

    /// Records that row `pos` holds the long `value`, without boxing it.
    pub fn add_long(&mut self, value: i64, pos: RowID) {
        match self {
            PackIndexBuilder::Long(map) => map.entry(value).or_default().push(pos),
            PackIndexBuilder::Generic(map) => map.entry(Value::Long(value)).or_default().push(pos),
        }
    }

    /// Freezes the accumulated lists.
    pub fn build(self) -> PackIndex {
        match self {
            PackIndexBuilder::Long(mut map) => {
                map.values_mut().for_each(|rows| rows.shrink_to_fit());
                PackIndex::Long(map)
            }
            PackIndexBuilder::Generic(mut map) => {
                map.values_mut().for_each(|rows| rows.shrink_to_fit());
                PackIndex::Generic(map)
            }
        }
    }
}

/// Immutable value → positions index for one column.

#[derive(Debug, Clone)]
pub enum PackIndex {
    /// Hashed [`Value`] keys.
    Generic(FxHashMap<Value, Vec<RowID>>),
    /// Primitive `i64` keys.
    Long(FxHashMap<i64, Vec<RowID>>),
}

impl PackIndex {
    /// Scans `store` and indexes every present row.
    ///
    /// Row positions of the store must fit [`RowID`]; packed collections
    /// enforce that bound while loading.
    pub fn build(store: &AttrStore) -> PackIndex {
        let mut builder = PackIndexBuilder::for_kind(store.kind());
        if store.kind() == AttrType::Long {
            for row in 0..store.len() {
                if let Some(v) = store.get_long(row) {
                    builder.add_long(v, row as RowID);
                }
            }
        } else {
            for (row, value) in store.iter().enumerate() {
                if let Some(value) = value {
                    builder.add(&value, row as RowID);
                }
            }
        }
        builder.build()
    }

    /// Positions holding `value`, ascending; empty for unseen values.
    pub fn positions(&self, value: &Value) -> &[RowID] {
        let rows = match (self, value) {
            (PackIndex::Long(map), Value::Long(v)) => map.get(v),
            (PackIndex::Long(_), _) => None,
            (PackIndex::Generic(map), _) => map.get(value),
        };
        rows.map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct indexed values, in no particular order.
    pub fn values(&self) -> Vec<Value> {
        match self {
            PackIndex::Long(map) => map.keys().map(|&v| Value::Long(v)).collect(),
            PackIndex::Generic(map) => map.keys().cloned().collect(),
        }
    }

    /// Iterates over `(value, positions)` pairs, in no particular order.
    pub fn groups(&self) -> Box<dyn Iterator<Item = (Value, &[RowID])> + '_> {
        match self {
            PackIndex::Long(map) => {
                Box::new(map.iter().map(|(&v, rows)| (Value::Long(v), rows.as_slice())))
            }
            PackIndex::Generic(map) => {
                Box::new(map.iter().map(|(v, rows)| (v.clone(), rows.as_slice())))
            }
        }
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        match self {
            PackIndex::Long(map) => map.len(),
            PackIndex::Generic(map) => map.len(),
        }
    }

    /// Returns `true` if the indexed column held no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
