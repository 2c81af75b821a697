//! Sharded column storage for a single attribute.
//!
//! A column is a sequence of [`Shard`]s, each holding [`SHARD_SIZE`] rows,
//! addressed as:
//!
//! ```text
//! row i  ->  shard (i >> SHARD_BITS), slot (i & SHARD_MASK)
//! ```
//!
//! # What this module provides
//!
//! - **[`AttrStoreBuilder`]**: a growable column. Values are appended with
//!   [`add`](AttrStoreBuilder::add) or [`skip`](AttrStoreBuilder::skip); the
//!   destination shard is adapted to a wider encoding whenever the incoming
//!   value requires it. Positions can be rewritten with
//!   [`set`](AttrStoreBuilder::set) and exchanged with
//!   [`swap`](AttrStoreBuilder::swap), which is how packed builders reorder
//!   every column in lockstep when sorting by id.
//! - **[`AttrStore`]**: the immutable result of
//!   [`build`](AttrStoreBuilder::build). Its constructor checks the layout
//!   invariant and panics if it is violated.
//!
//! # Invariants
//!
//! - Every shard except the last holds exactly [`SHARD_SIZE`] slots.
//! - The shard sizes sum to the column length.
//! - Appends never leave gaps; absent values are recorded through the shard's
//!   presence mask.
//!
//! A violated invariant is a bug in the store, not bad input, so it aborts
//! rather than returning an error.

use crate::engine::error::{ShardError, SlotOutOfRangeError};
use crate::engine::shard::{Shard, ShardEncoding};
use crate::engine::types::{shard_of, slot_of, AttrType, Value, SHARD_SIZE};


/// Growable, adaptively encoded column.
///
/// ## Example
/// ```
/// use packed_entities::{AttrStoreBuilder, AttrType, Value};
///
/// let mut col = AttrStoreBuilder::new(AttrType::Long);
/// col.add(Some(&Value::Long(3))).unwrap();
/// col.skip().unwrap();
/// col.add(Some(&Value::Long(1 << 40))).unwrap();
///
/// let store = col.build();
/// assert_eq!(store.get(0), Some(Value::Long(3)));
/// assert_eq!(store.get(1), None);
/// assert_eq!(store.get(2), Some(Value::Long(1 << 40)));
/// ```

#[derive(Clone, Debug)]
pub struct AttrStoreBuilder {
    kind: AttrType,
    shards: Vec<Shard>,
    size: usize,
}

impl AttrStoreBuilder {
    /// Creates an empty column for values of `kind`.
    pub fn new(kind: AttrType) -> Self {
        Self { kind, shards: Vec::new(), size: 0 }
    }

    /// Declared value kind.
    #[inline]
    pub fn kind(&self) -> AttrType {
        self.kind
    }

    /// Number of rows, present or absent.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if no row has been appended.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Appends `value` (or an absent slot for `None`).
    ///
    /// A failed append leaves the column unchanged.
    pub fn add(&mut self, value: Option<&Value>) -> Result<(), ShardError> {
        if self.shards.len() == shard_of(self.size) {
            self.shards.push(Shard::create(self.kind));
        }
        let index = self.size;
        self.write(index, value)?;
        self.size += 1;
        Ok(())
    }

    /// Appends an absent slot.
    #[inline]
    pub fn skip(&mut self) -> Result<(), ShardError> {
        self.add(None)
    }

    /// Overwrites row `index` (`None` clears it).
    ///
    /// # Errors
    /// [`ShardError::SlotOutOfRange`] if `index >= len()`, plus any error of
    /// [`Shard::adapt`] or [`Shard::put`].
    pub fn set(&mut self, index: usize, value: Option<&Value>) -> Result<(), ShardError> {
        self.check(index)?;
        self.write(index, value)
    }

    /// Exchanges the values (and presence) at `i` and `j`.
    ///
    /// Both writes go through the owning shard's `adapt` + `put`, so swapping
    /// a wide value into a compact shard promotes that shard.
    pub fn swap(&mut self, i: usize, j: usize) -> Result<(), ShardError> {
        self.check(i)?;
        self.check(j)?;
        if i == j {
            return Ok(());
        }
        let a = self.get(i);
        let b = self.get(j);
        self.write(i, b.as_ref())?;
        self.write(j, a.as_ref())
    }

    /// Reads row `index`; `None` when absent or out of range.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Value> {
        if index >= self.size {
            return None;
        }
        self.shards[shard_of(index)].get(slot_of(index))
    }

    /// Reads an integer row without boxing.
    #[inline]
    pub fn get_long(&self, index: usize) -> Option<i64> {
        if index >= self.size {
            return None;
        }
        self.shards[shard_of(index)].get_long(slot_of(index))
    }

    /// Returns `true` if row `index` holds no value.
    #[inline]
    pub fn is_null(&self, index: usize) -> bool {
        index >= self.size || self.shards[shard_of(index)].is_null(slot_of(index))
    }

    /// Current encoding of each shard, in order.
    pub fn encodings(&self) -> Vec<ShardEncoding> {
        self.shards.iter().map(Shard::encoding).collect()
    }

    /// Compacts every shard and freezes the column.
    pub fn build(mut self) -> AttrStore {
        for shard in &mut self.shards {
            shard.compact();
        }
        AttrStore::new(self.kind, self.shards, self.size)
    }

    /// Freezes a copy of the column without compacting or consuming it.
    pub fn temp_build(&self) -> AttrStore {
        AttrStore::new(self.kind, self.shards.clone(), self.size)
    }

    fn check(&self, index: usize) -> Result<(), ShardError> {
        if index < self.size {
            Ok(())
        } else {
            Err(SlotOutOfRangeError { slot: index, capacity: self.size }.into())
        }
    }

    fn write(&mut self, index: usize, value: Option<&Value>) -> Result<(), ShardError> {
        let shard = &mut self.shards[shard_of(index)];
        if let Some(wider) = shard.adapt(value)? {
            *shard = wider;
        }
        shard.put(slot_of(index), value)
    }
}

/// Immutable column produced by [`AttrStoreBuilder::build`].

#[derive(Clone, Debug)]
pub struct AttrStore {
    kind: AttrType,
    shards: Vec<Shard>,
    size: usize,
}

impl AttrStore {
    /// Wraps `shards` as a column of `size` rows.
    ///
    /// # Panics
    /// If any shard but the last is not full, or if the shard sizes do not
    /// sum to `size`.
    pub fn new(kind: AttrType, shards: Vec<Shard>, size: usize) -> Self {
        let mut total = 0usize;
        for (i, shard) in shards.iter().enumerate() {
            assert!(
                i + 1 == shards.len() || shard.len() == SHARD_SIZE,
                "shard {i} of {} holds {} slots; only the last shard may be partial",
                shards.len(),
                shard.len()
            );
            assert_eq!(shard.family(), kind, "shard {i} belongs to another column family");
            total += shard.len();
        }
        assert_eq!(total, size, "shard sizes sum to {total}, column declares {size}");
        Self { kind, shards, size }
    }

    /// Declared value kind.
    #[inline]
    pub fn kind(&self) -> AttrType {
        self.kind
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` for an empty column.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Reads row `index`; `None` when absent or out of range.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Value> {
        if index >= self.size {
            return None;
        }
        self.shards[shard_of(index)].get(slot_of(index))
    }

    /// Reads an integer row without boxing.
    #[inline]
    pub fn get_long(&self, index: usize) -> Option<i64> {
        if index >= self.size {
            return None;
        }
        self.shards[shard_of(index)].get_long(slot_of(index))
    }

    /// Reads a numeric row as `f64`.
    #[inline]
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        if index >= self.size {
            return None;
        }
        self.shards[shard_of(index)].get_f64(slot_of(index))
    }

    /// Returns `true` if row `index` holds no value.
    #[inline]
    pub fn is_null(&self, index: usize) -> bool {
        index >= self.size || self.shards[shard_of(index)].is_null(slot_of(index))
    }

    /// The column's shards, in row order.
    #[inline]
    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    /// Current encoding of each shard, in order.
    pub fn encodings(&self) -> Vec<ShardEncoding> {
        self.shards.iter().map(Shard::encoding).collect()
    }

    /// Iterates every row in order, yielding `None` for absent rows.
    pub fn iter(&self) -> impl Iterator<Item = Option<Value>> + '_ {
        self.shards.iter().flat_map(Shard::iter)
    }
}
