//! # Packed entity collections
//!
//! This module ties one id column, N attribute columns and optional per-column
//! indexes into a single immutable collection.
//!
//! ## Layout
//!
//! Column `a` stores attribute `a` of the collection's [`AttributeSet`];
//! column 0 is the entity id. Row `p` is one entity: its id is `ids[p]` and its
//! attribute `a` is absent iff `columns[a].is_null(p)`.
//!
//! ```text
//!           id    user   rating   (attribute positions 0..n)
//! row 0  |  3  |  17  |  4.5   |
//! row 1  |  8  |  17  |   -    |   <- rating absent
//! row 2  | 11  |  42  |  3.0   |
//! ```
//!
//! ## Lifecycle
//!
//! A [`PackedEntityCollectionBuilder`] accumulates rows through
//! [`add`](PackedEntityCollectionBuilder::add), keeping every column the same
//! length by appending an absent slot wherever an entity lacks an attribute.
//! [`build`](PackedEntityCollectionBuilder::build) consumes the builder:
//!
//! 1. if ids arrived out of order, every column is permuted in lockstep so
//!    the id column is ascending,
//! 2. column storage is compacted,
//! 3. requested indexes are built from the finished columns.
//!
//! The resulting [`PackedEntityCollection`] never changes again, so it can be
//! shared across threads and read concurrently.
//!
//! ## Duplicate ids
//!
//! While ids keep arriving in ascending order, a repeated id is located by
//! binary search over the id column: with `replace = true` the row is
//! overwritten in place (attributes the new entity lacks become absent),
//! otherwise the entity is dropped. Once an id arrives out of order the
//! builder switches to a hash set of seen ids; from then on a duplicate is
//! still dropped when `replace = false`, but `replace = true` fails with
//! [`StoreError::UnsupportedReplace`].
//!
//! ## Row views
//!
//! Queries return [`RowEntity`] values: a row position plus a reference to the
//! collection. Nothing is copied; attribute values are decoded on access.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{OnceLock, RwLock};

use md5::{Digest, Md5};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace, warn};

use crate::engine::attribute::{AttributeSet, TypedName};
use crate::engine::config::PackConfig;
use crate::engine::entity::{BasicEntity, Entity, EntityType};
use crate::engine::error::{CapacityError, SchemaError, StoreError, StoreResult};
use crate::engine::index::PackIndex;
use crate::engine::reduce::{reduce_shards, Accumulator};
use crate::engine::shard::{Shard, ShardEncoding};
use crate::engine::storage::{AttrStore, AttrStoreBuilder};
use crate::engine::types::{AttrID, AttrMask, AttrType, EntityID, RowID, Value};


/// Largest number of rows a packed collection can address.
pub const MAX_ROWS: u64 = RowID::MAX as u64 + 1;

/// What [`PackedEntityCollectionBuilder::add`] did with an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// Appended as a new row.
    Added,
    /// Overwrote the existing row with the same id.
    Replaced,
    /// Ignored because the id was already present.
    Dropped,
}

/// Binary search over a strictly ascending id sequence addressed by position.
fn search_ids(len: usize, target: EntityID, id_at: impl Fn(usize) -> EntityID) -> Result<usize, usize> {
    let (mut lo, mut hi) = (0usize, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match id_at(mid).cmp(&target) {
            std::cmp::Ordering::Less => lo = mid + 1,
            std::cmp::Ordering::Greater => hi = mid,
            std::cmp::Ordering::Equal => return Ok(mid),
        }
    }
    Err(lo)
}

/// Single-use builder for a [`PackedEntityCollection`].
///
/// ## Invariants
/// - Every column holds exactly `len()` rows.
/// - While `sorted` holds, the id column is strictly ascending.
/// - Once unsorted, `ids` holds every id in the id column.
///
/// Not safe for concurrent `add`; own it exclusively while loading.

pub struct PackedEntityCollectionBuilder {
    entity_type: EntityType,
    attributes: AttributeSet,
    columns: Vec<AttrStoreBuilder>,
    need_index: Vec<bool>,
    ids: Option<FxHashSet<EntityID>>,
    sorted: bool,
    last_id: Option<EntityID>,
    config: PackConfig,
}

impl PackedEntityCollectionBuilder {
    /// Creates a builder storing `attributes` for entities of `entity_type`.
    pub fn new(entity_type: EntityType, attributes: AttributeSet) -> Self {
        let columns = attributes
            .iter()
            .map(|attr| {
                debug!(
                    entity_type = %entity_type,
                    attribute = attr.name(),
                    kind = %attr.kind(),
                    "storing packed column"
                );
                AttrStoreBuilder::new(attr.kind())
            })
            .collect();
        let need_index = vec![false; attributes.len()];
        Self {
            entity_type,
            attributes,
            columns,
            need_index,
            ids: None,
            sorted: true,
            last_id: None,
            config: PackConfig::default(),
        }
    }

    /// Replaces the builder's configuration.
    pub fn with_config(mut self, config: PackConfig) -> Self {
        self.config = config;
        self
    }

    /// Requests an index on `name`. Unknown names are ignored.
    ///
    /// May be called before or after entities have been added.
    pub fn add_index(&mut self, name: &str) -> &mut Self {
        if let Some(pos) = self.attributes.lookup(name) {
            self.need_index[pos] = true;
        }
        self
    }

    /// Requests an index on `attr`, if the schema holds it with that kind.
    pub fn add_index_typed(&mut self, attr: &TypedName) -> &mut Self {
        if let Some(pos) = self.attributes.lookup_typed(attr) {
            self.need_index[pos] = true;
        }
        self
    }

    /// Entity type of every added entity.
    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// Declared attributes, id first.
    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    /// Rows accumulated so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.columns[0].len()
    }

    /// Returns `true` if nothing has been added.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` while ids have arrived in strictly ascending order.
    #[inline]
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Adds `entity`, handling a repeated id according to `replace`.
    ///
    /// Attributes of the entity that are not part of the schema (by name and
    /// kind) are ignored; schema attributes the entity lacks are stored as
    /// absent.
    ///
    /// # Errors
    /// - [`StoreError::UnsupportedReplace`] for `replace = true` on a repeated
    ///   id after ids went out of order,
    /// - [`StoreError::Schema`] if the entity pairs an attribute with a value
    ///   of another kind,
    /// - [`StoreError::Capacity`] past [`MAX_ROWS`].
    ///
    /// A failed add leaves the builder unchanged.
    pub fn add<E: Entity + ?Sized>(&mut self, entity: &E, replace: bool) -> StoreResult<AddOutcome> {
        let id = entity.id();
        let row = self.collect_row(entity)?;

        if self.sorted {
            if let Some(last) = self.last_id {
                if id <= last {
                    let len = self.len();
                    let ids = &self.columns[0];
                    match search_ids(len, id, |p| ids.get_long(p).unwrap_or_default()) {
                        Ok(pos) if replace => {
                            self.overwrite(pos, &row)?;
                            trace!(entity_type = %self.entity_type, id, "replaced duplicate entity");
                            return Ok(AddOutcome::Replaced);
                        }
                        Ok(_) => {
                            trace!(entity_type = %self.entity_type, id, "dropped duplicate entity");
                            return Ok(AddOutcome::Dropped);
                        }
                        Err(_) => self.mark_unsorted(),
                    }
                }
            }
        } else if self.ids.as_ref().is_some_and(|ids| ids.contains(&id)) {
            if replace {
                return Err(StoreError::UnsupportedReplace { id });
            }
            trace!(entity_type = %self.entity_type, id, "dropped duplicate entity");
            return Ok(AddOutcome::Dropped);
        }

        self.append(&row)?;
        if let Some(ids) = self.ids.as_mut() {
            ids.insert(id);
        }
        if self.sorted {
            self.last_id = Some(id);
        }
        Ok(AddOutcome::Added)
    }

    /// Lines the entity's values up with the schema, validating kinds.
    fn collect_row<E: Entity + ?Sized>(&self, entity: &E) -> StoreResult<Vec<Option<Value>>> {
        let mut row = vec![None; self.attributes.len()];
        row[0] = Some(Value::Long(entity.id()));
        for (attr, value) in entity.attribute_values() {
            if attr.is_entity_id() {
                continue;
            }
            if let Some(pos) = self.attributes.lookup_typed(&attr) {
                attr.check(&value)?;
                row[pos] = Some(value);
            }
        }
        Ok(row)
    }

    fn append(&mut self, row: &[Option<Value>]) -> StoreResult<()> {
        let len = self.len() as u64;
        if len >= MAX_ROWS {
            return Err(CapacityError { rows_needed: len + 1, capacity: MAX_ROWS }.into());
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.add(value.as_ref())?;
        }
        Ok(())
    }

    fn overwrite(&mut self, pos: usize, row: &[Option<Value>]) -> StoreResult<()> {
        for (column, value) in self.columns.iter_mut().zip(row).skip(1) {
            column.set(pos, value.as_ref())?;
        }
        Ok(())
    }

    fn mark_unsorted(&mut self) {
        let ids: FxHashSet<EntityID> = (0..self.len())
            .filter_map(|p| self.columns[0].get_long(p))
            .collect();
        debug!(
            entity_type = %self.entity_type,
            rows = ids.len(),
            "ids out of order; tracking seen ids in a hash set"
        );
        self.ids = Some(ids);
        self.sorted = false;
    }

    /// Permutes every column so the id column is ascending.
    fn sort_rows(&mut self) -> StoreResult<()> {
        let len = self.len();
        let keys: Vec<EntityID> = (0..len)
            .map(|p| self.columns[0].get_long(p).unwrap_or_default())
            .collect();
        let mut order: Vec<usize> = (0..len).collect();
        order.sort_unstable_by_key(|&p| keys[p]);

        // Row k must end up holding old row order[k]; follow each cycle.
        let mut placed = vec![false; len];
        for start in 0..len {
            if placed[start] {
                continue;
            }
            let mut j = start;
            loop {
                placed[j] = true;
                let k = order[j];
                if k == start {
                    break;
                }
                for column in &mut self.columns {
                    column.swap(j, k)?;
                }
                j = k;
            }
        }
        self.sorted = true;
        self.ids = None;
        Ok(())
    }

    /// Snapshot of the rows added so far: iterable and searchable, but
    /// unindexed and uncompacted.
    pub fn snapshot(&self) -> PackedEntityCollection {
        let columns = self.columns.iter().map(AttrStoreBuilder::temp_build).collect();
        PackedEntityCollection::new(
            self.entity_type.clone(),
            self.attributes.clone(),
            columns,
            vec![None; self.attributes.len()],
            self.sorted,
            self.config,
        )
    }

    /// Sorts, compacts and indexes the accumulated rows.
    pub fn build(mut self) -> StoreResult<PackedEntityCollection> {
        if !self.sorted {
            debug!(entity_type = %self.entity_type, rows = self.len(), "sorting rows by id");
            self.sort_rows()?;
        }

        let columns: Vec<AttrStore> = self.columns.into_iter().map(AttrStoreBuilder::build).collect();
        let wanted: Vec<AttrID> = self
            .need_index
            .iter()
            .enumerate()
            .filter_map(|(i, &need)| need.then_some(i))
            .collect();

        let entity_type = &self.entity_type;
        let attributes = &self.attributes;
        let index_column = |i: AttrID| {
            let index = PackIndex::build(&columns[i]);
            debug!(
                entity_type = %entity_type,
                attribute = attributes.attribute(i).name(),
                values = index.len(),
                "built column index"
            );
            (i, index)
        };
        let built: Vec<(AttrID, PackIndex)> = if self.config.parallel_indexing {
            wanted.par_iter().map(|&i| index_column(i)).collect()
        } else {
            wanted.iter().map(|&i| index_column(i)).collect()
        };

        let mut indexes = vec![None; self.attributes.len()];
        for (i, index) in built {
            indexes[i] = Some(index);
        }

        Ok(PackedEntityCollection::new(
            self.entity_type,
            self.attributes,
            columns,
            indexes,
            true,
            self.config,
        ))
    }
}

impl fmt::Debug for PackedEntityCollectionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackedEntityCollectionBuilder")
            .field("type", &self.entity_type)
            .field("entities", &self.len())
            .field("sorted", &self.sorted)
            .finish()
    }
}

/// Summary of a collection: size, schema and content fingerprint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionDescription {
    /// Entity type tag.
    pub entity_type: EntityType,
    /// Number of entities.
    pub entity_count: usize,
    /// Attributes, rendered as `TypedName[name: kind]`.
    pub attributes: Vec<String>,
    /// Lowercase hex MD5 of the collection contents.
    pub content_hash: String,
}

/// Immutable, column-packed collection of entities sorted by id.
///
/// Safe to share across threads; the only interior mutability is the lazily
/// computed content hash and the memo of missing-attribute subsets.

pub struct PackedEntityCollection {
    entity_type: EntityType,
    attributes: AttributeSet,
    columns: Vec<AttrStore>,
    indexes: Vec<Option<PackIndex>>,
    sorted: bool,
    config: PackConfig,
    content_hash: OnceLock<[u8; 16]>,
    attr_sets: RwLock<FxHashMap<AttrMask, AttributeSet>>,
    attr_sets_full: AtomicBool,
}

impl PackedEntityCollection {
    fn new(
        entity_type: EntityType,
        attributes: AttributeSet,
        columns: Vec<AttrStore>,
        indexes: Vec<Option<PackIndex>>,
        sorted: bool,
        config: PackConfig,
    ) -> Self {
        assert_eq!(columns.len(), attributes.len(), "one column per attribute");
        let size = columns[0].len();
        assert!(columns.iter().all(|c| c.len() == size), "columns must be row-aligned");
        Self {
            entity_type,
            attributes,
            columns,
            indexes,
            sorted,
            config,
            content_hash: OnceLock::new(),
            attr_sets: RwLock::new(FxHashMap::default()),
            attr_sets_full: AtomicBool::new(false),
        }
    }

    /// Entity type of every member.
    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// Declared attributes, id first.
    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    /// Number of entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.columns[0].len()
    }

    /// Alias of [`len`](Self::len).
    #[inline]
    pub fn size(&self) -> usize {
        self.len()
    }

    /// Returns `true` if the collection holds no entities.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if rows are ordered by id. Only builder snapshots taken
    /// after ids went out of order report `false`.
    #[inline]
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Returns `true` if `name` has an index.
    pub fn is_indexed(&self, name: &str) -> bool {
        self.attributes.lookup(name).is_some_and(|a| self.indexes[a].is_some())
    }

    /// Attributes the collection is ordered by.
    pub fn sort_keys(&self) -> Vec<TypedName> {
        if self.sorted { vec![TypedName::entity_id()] } else { Vec::new() }
    }

    #[inline]
    fn id_at(&self, pos: usize) -> EntityID {
        self.columns[0].get_long(pos).unwrap_or_default()
    }

    #[inline]
    fn row_at(&self, pos: usize) -> RowEntity<'_> {
        RowEntity { collection: self, pos, id: self.id_at(pos) }
    }

    /// Row position of `id`.
    pub fn position_of(&self, id: EntityID) -> Option<usize> {
        if self.sorted {
            search_ids(self.len(), id, |p| self.id_at(p)).ok()
        } else {
            (0..self.len()).find(|&p| self.id_at(p) == id)
        }
    }

    /// The entity with `id`, if present. `O(log n)`.
    pub fn lookup(&self, id: EntityID) -> Option<RowEntity<'_>> {
        self.position_of(id).map(|p| self.row_at(p))
    }

    /// Returns `true` if an entity with `id` is present.
    pub fn contains(&self, id: EntityID) -> bool {
        self.position_of(id).is_some()
    }

    /// The entity at row `pos`.
    pub fn row(&self, pos: usize) -> Option<RowEntity<'_>> {
        (pos < self.len()).then(|| self.row_at(pos))
    }

    /// Entities whose `name` attribute equals `value`, in row order.
    ///
    /// Uses the attribute's index when one was built and scans the column
    /// otherwise; both give the same result. Unknown attributes and values of
    /// another kind match nothing.
    pub fn find(&self, name: &str, value: &Value) -> Vec<RowEntity<'_>> {
        match self.attributes.lookup(name) {
            Some(a) => self.find_at(a, value),
            None => Vec::new(),
        }
    }

    /// Like [`find`](Self::find), but the attribute must match by name and kind.
    pub fn find_typed(&self, attr: &TypedName, value: &Value) -> Vec<RowEntity<'_>> {
        match self.attributes.lookup_typed(attr) {
            Some(a) => self.find_at(a, value),
            None => Vec::new(),
        }
    }

    fn find_at(&self, a: AttrID, value: &Value) -> Vec<RowEntity<'_>> {
        if let Some(index) = &self.indexes[a] {
            return index.positions(value).iter().map(|&p| self.row_at(p as usize)).collect();
        }
        if a == 0 {
            return value.as_long().and_then(|id| self.lookup(id)).into_iter().collect();
        }

        let column = &self.columns[a];
        match value {
            Value::Long(v) if column.kind() == AttrType::Long => (0..self.len())
                .filter(|&p| column.get_long(p) == Some(*v))
                .map(|p| self.row_at(p))
                .collect(),
            _ => (0..self.len())
                .filter(|&p| column.get(p).as_ref() == Some(value))
                .map(|p| self.row_at(p))
                .collect(),
        }
    }

    /// Groups entities by their value of `name`; entities lacking it are
    /// left out. Each group is in row order.
    pub fn grouped(&self, name: &str) -> FxHashMap<Value, Vec<RowEntity<'_>>> {
        let mut groups: FxHashMap<Value, Vec<RowEntity<'_>>> = FxHashMap::default();
        let Some(a) = self.attributes.lookup(name) else { return groups };

        if let Some(index) = &self.indexes[a] {
            for (value, rows) in index.groups() {
                groups.insert(value, rows.iter().map(|&p| self.row_at(p as usize)).collect());
            }
            return groups;
        }

        for (pos, value) in self.columns[a].iter().enumerate() {
            if let Some(value) = value {
                groups.entry(value).or_default().push(self.row_at(pos));
            }
        }
        groups
    }

    /// Iterates over every entity in row order. Each call starts afresh.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = RowEntity<'_>> + '_ {
        (0..self.len()).map(move |p| self.row_at(p))
    }

    /// The set of ids in the collection.
    pub fn id_set(&self) -> IdSet<'_> {
        IdSet { ids: &self.columns[0], sorted: self.sorted }
    }

    /// Read-only view of the `name` column.
    pub fn column(&self, name: &str) -> Option<ColumnView<'_>> {
        self.attributes.lookup(name).map(|a| ColumnView {
            attribute: self.attributes.attribute(a),
            store: &self.columns[a],
        })
    }

    /// Folds the numeric `name` column shard by shard on the rayon pool.
    ///
    /// Absent values are skipped. Per-shard results are combined in shard
    /// order, so the result is deterministic.
    ///
    /// # Errors
    /// [`StoreError::NoSuchAttribute`] for an unknown name;
    /// [`SchemaError::ValueType`] for a bool or text column.
    pub fn reduce_column<A, I, F, C>(&self, name: &str, init: I, fold: F, combine: C) -> StoreResult<A>
    where
        A: Send,
        I: Fn() -> A + Sync,
        F: Fn(&mut A, f64) + Sync,
        C: Fn(&mut A, A),
    {
        let column = self.column(name).ok_or_else(|| StoreError::NoSuchAttribute(name.to_string()))?;
        match column.kind() {
            AttrType::Long | AttrType::Int | AttrType::Double => {
                Ok(reduce_shards(column.shards(), init, fold, combine))
            }
            kind => Err(SchemaError::ValueType {
                attribute: name.to_string(),
                expected: AttrType::Double,
                actual: kind,
            }
            .into()),
        }
    }

    /// [`reduce_column`](Self::reduce_column) with a stock [`Accumulator`].
    pub fn summarize<A: Accumulator>(&self, name: &str) -> StoreResult<A> {
        self.reduce_column(name, A::default, A::push, A::combine)
    }

    /// MD5 fingerprint of the collection contents, computed once.
    ///
    /// Covers every row in id order: the id, then each attribute value with a
    /// kind tag (absent values included). Collections built from the same
    /// entities in any insertion order share a hash.
    pub fn content_hash(&self) -> [u8; 16] {
        *self.content_hash.get_or_init(|| {
            let mut hasher = Md5::new();
            for pos in 0..self.len() {
                hasher.update(self.id_at(pos).to_le_bytes());
                for column in &self.columns[1..] {
                    hash_value(&mut hasher, column.get(pos).as_ref());
                }
            }
            hasher.finalize().into()
        })
    }

    /// Size, schema and content hash.
    pub fn describe(&self) -> CollectionDescription {
        CollectionDescription {
            entity_type: self.entity_type.clone(),
            entity_count: self.len(),
            attributes: self.attributes.iter().map(ToString::to_string).collect(),
            content_hash: self.content_hash().iter().map(|b| format!("{b:02x}")).collect(),
        }
    }

    /// Attributes present at row `pos`, memoized by missing-attribute mask.
    fn attributes_at(&self, pos: usize) -> AttributeSet {
        let mut missing = AttrMask::default();
        for (a, column) in self.columns.iter().enumerate().skip(1) {
            if column.is_null(pos) {
                missing.set(a);
            }
        }
        if missing.is_empty() {
            return self.attributes.clone();
        }

        if let Ok(cache) = self.attr_sets.read() {
            if let Some(set) = cache.get(&missing) {
                return set.clone();
            }
        }

        let set = self.attributes.without(missing);
        if let Ok(mut cache) = self.attr_sets.write() {
            if cache.len() < self.config.attribute_set_cache_limit {
                cache.insert(missing, set.clone());
            } else if !self.attr_sets_full.swap(true, Ordering::Relaxed) {
                warn!(
                    entity_type = %self.entity_type,
                    limit = self.config.attribute_set_cache_limit,
                    "attribute subset cache full; further subsets are not memoized"
                );
            }
        }
        set
    }
}

fn hash_value(hasher: &mut Md5, value: Option<&Value>) {
    match value {
        None => hasher.update([0u8]),
        Some(Value::Long(v)) => {
            hasher.update([1u8]);
            hasher.update(v.to_le_bytes());
        }
        Some(Value::Int(v)) => {
            hasher.update([2u8]);
            hasher.update(v.to_le_bytes());
        }
        Some(Value::Double(v)) => {
            hasher.update([3u8]);
            hasher.update(v.to_bits().to_le_bytes());
        }
        Some(Value::Bool(v)) => hasher.update([4u8, u8::from(*v)]),
        Some(Value::Text(s)) => {
            hasher.update([5u8]);
            hasher.update((s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
    }
}

impl fmt::Debug for PackedEntityCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackedEntityCollection")
            .field("type", &self.entity_type)
            .field("entities", &self.len())
            .finish()
    }
}

impl<'a> IntoIterator for &'a PackedEntityCollection {
    type Item = RowEntity<'a>;
    type IntoIter = Box<dyn Iterator<Item = RowEntity<'a>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Lazy view of one row of a [`PackedEntityCollection`].
///
/// Holds a row position and a reference to the collection; attribute values
/// are decoded from the columns on every access.

#[derive(Clone, Copy)]
pub struct RowEntity<'a> {
    collection: &'a PackedEntityCollection,
    pos: usize,
    id: EntityID,
}

impl<'a> RowEntity<'a> {
    /// Row position inside the collection.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Present attributes with their values, id first.
    pub fn attributes(&self) -> impl Iterator<Item = (&'a TypedName, Value)> + 'a {
        let collection = self.collection;
        let pos = self.pos;
        collection
            .columns
            .iter()
            .enumerate()
            .filter_map(move |(a, column)| column.get(pos).map(|v| (collection.attributes.attribute(a), v)))
    }

    fn column_of(&self, name: &str) -> StoreResult<&'a AttrStore> {
        self.collection
            .attributes
            .lookup(name)
            .map(|a| &self.collection.columns[a])
            .ok_or_else(|| StoreError::NoSuchAttribute(name.to_string()))
    }

    fn missing(&self, name: &str) -> StoreError {
        StoreError::MissingValue { attribute: name.to_string(), id: self.id }
    }
}

impl Entity for RowEntity<'_> {
    fn entity_type(&self) -> EntityType {
        self.collection.entity_type.clone()
    }

    #[inline]
    fn id(&self) -> EntityID {
        self.id
    }

    fn attribute_names(&self) -> AttributeSet {
        self.collection.attributes_at(self.pos)
    }

    fn get(&self, name: &str) -> Option<Value> {
        let a = self.collection.attributes.lookup(name)?;
        self.collection.columns[a].get(self.pos)
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.collection
            .attributes
            .lookup(name)
            .is_some_and(|a| !self.collection.columns[a].is_null(self.pos))
    }

    fn get_typed(&self, attr: &TypedName) -> Option<Value> {
        let a = self.collection.attributes.lookup_typed(attr)?;
        self.collection.columns[a].get(self.pos)
    }

    /// # Errors
    /// [`StoreError::NoSuchAttribute`] if the collection has no such column,
    /// [`StoreError::MissingValue`] if this row lacks it,
    /// [`SchemaError::ValueType`] for a column of another kind.
    fn long_value(&self, name: &str) -> StoreResult<i64> {
        let column = self.column_of(name)?;
        if column.kind() != AttrType::Long {
            return Err(SchemaError::ValueType {
                attribute: name.to_string(),
                expected: AttrType::Long,
                actual: column.kind(),
            }
            .into());
        }
        column.get_long(self.pos).ok_or_else(|| self.missing(name))
    }

    fn double_value(&self, name: &str) -> StoreResult<f64> {
        let column = self.column_of(name)?;
        if column.kind() != AttrType::Double {
            return Err(SchemaError::ValueType {
                attribute: name.to_string(),
                expected: AttrType::Double,
                actual: column.kind(),
            }
            .into());
        }
        column.get_f64(self.pos).ok_or_else(|| self.missing(name))
    }

    fn attribute_values(&self) -> Vec<(TypedName, Value)> {
        self.attributes().map(|(attr, v)| (attr.clone(), v)).collect()
    }
}

impl fmt::Debug for RowEntity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowEntity")
            .field("type", &self.collection.entity_type)
            .field("id", &self.id)
            .field("position", &self.pos)
            .finish()
    }
}

impl PartialEq for RowEntity<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.collection, other.collection) && self.pos == other.pos
    }
}

impl PartialEq<BasicEntity> for RowEntity<'_> {
    fn eq(&self, other: &BasicEntity) -> bool {
        self.to_basic() == *other
    }
}

/// The ids of a packed collection, in row order.

#[derive(Clone, Copy, Debug)]
pub struct IdSet<'a> {
    ids: &'a AttrStore,
    sorted: bool,
}

impl<'a> IdSet<'a> {
    /// Number of ids.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns `true` if `id` is in the set.
    pub fn contains(&self, id: EntityID) -> bool {
        let ids = self.ids;
        if self.sorted {
            search_ids(ids.len(), id, |p| ids.get_long(p).unwrap_or_default()).is_ok()
        } else {
            (0..ids.len()).any(|p| ids.get_long(p) == Some(id))
        }
    }

    /// Iterates over the ids; ascending for built collections.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = EntityID> + 'a {
        let ids = self.ids;
        (0..ids.len()).map(move |p| ids.get_long(p).unwrap_or_default())
    }

    /// Copies the ids out, ascending.
    pub fn to_vec(&self) -> Vec<EntityID> {
        self.iter().collect()
    }
}

/// Read-only view of one packed column.

#[derive(Clone, Copy, Debug)]
pub struct ColumnView<'a> {
    attribute: &'a TypedName,
    store: &'a AttrStore,
}

impl<'a> ColumnView<'a> {
    /// Attribute stored in the column.
    pub fn attribute(&self) -> &'a TypedName {
        self.attribute
    }

    /// Declared kind of the column.
    pub fn kind(&self) -> AttrType {
        self.store.kind()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Value at row `pos`.
    pub fn get(&self, pos: usize) -> Option<Value> {
        self.store.get(pos)
    }

    /// Returns `true` if row `pos` holds no value.
    pub fn is_null(&self, pos: usize) -> bool {
        self.store.is_null(pos)
    }

    /// Every row in order; `None` for absent values.
    pub fn iter(&self) -> impl Iterator<Item = Option<Value>> + 'a {
        self.store.iter()
    }

    /// Every row as `f64`; `None` for absent values and non-numeric columns.
    pub fn iter_f64(&self) -> impl Iterator<Item = Option<f64>> + 'a {
        let store = self.store;
        (0..store.len()).map(move |p| store.get_f64(p))
    }

    /// The column's shards, in row order.
    pub fn shards(&self) -> &'a [Shard] {
        self.store.shards()
    }

    /// Encoding chosen for each shard.
    pub fn encodings(&self) -> Vec<ShardEncoding> {
        self.store.encodings()
    }
}
