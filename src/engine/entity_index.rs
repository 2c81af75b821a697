//! Attribute indexes for object-backed collections.
//!
//! [`EntityIndexBuilder`] collects value → entity lists for one attribute and
//! freezes them into an [`EntityIndex`]. Long attributes are keyed by raw
//! `i64`; everything else hashes [`Value`]s. Entities are kept in the order
//! they were added.
//!
//! `build` takes `&mut self` and hands the accumulated maps over to the
//! index, so a builder is single-use: `add` or `build` after `build` is an
//! [`InvalidState`](StoreError::InvalidState) error.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::engine::attribute::TypedName;
use crate::engine::entity::{BasicEntity, Entity};
use crate::engine::error::{StoreError, StoreResult};
use crate::engine::types::{AttrType, Value};


#[derive(Debug, Clone)]
enum Postings {
    Generic(FxHashMap<Value, Vec<Arc<BasicEntity>>>),
    Long(FxHashMap<i64, Vec<Arc<BasicEntity>>>),
}

impl Postings {
    fn for_kind(kind: AttrType) -> Self {
        match kind {
            AttrType::Long => Postings::Long(FxHashMap::default()),
            _ => Postings::Generic(FxHashMap::default()),
        }
    }

    fn len(&self) -> usize {
        match self {
            Postings::Generic(map) => map.len(),
            Postings::Long(map) => map.len(),
        }
    }
}

/// Single-use builder for an [`EntityIndex`].

#[derive(Debug)]
pub struct EntityIndexBuilder {
    name: String,
    kind: Option<AttrType>,
    postings: Option<Postings>,
}

impl EntityIndexBuilder {
    /// Creates a builder indexing `attribute`; values of another kind are
    /// ignored.
    pub fn new(attribute: &TypedName) -> Self {
        Self {
            name: attribute.name().to_string(),
            kind: Some(attribute.kind()),
            postings: Some(Postings::for_kind(attribute.kind())),
        }
    }

    /// Creates a builder indexing every value stored under `name`, whatever
    /// its kind.
    pub fn by_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: None,
            postings: Some(Postings::Generic(FxHashMap::default())),
        }
    }

    /// Name of the indexed attribute.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared kind, or `None` for a by-name index.
    pub fn kind(&self) -> Option<AttrType> {
        self.kind
    }

    /// Records `entity` under its value for the indexed attribute.
    ///
    /// Entities without the attribute, or holding it with another kind, are
    /// ignored.
    pub fn add(&mut self, entity: &Arc<BasicEntity>) -> StoreResult<()> {
        let postings = self
            .postings
            .as_mut()
            .ok_or(StoreError::InvalidState("entity index builder already built"))?;
        let value = entity.get(&self.name).filter(|v| self.kind.map_or(true, |k| k.accepts(v)));
        let Some(value) = value else { return Ok(()) };
        match (postings, value) {
            (Postings::Long(map), Value::Long(v)) => map.entry(v).or_default().push(Arc::clone(entity)),
            (Postings::Generic(map), value) => map.entry(value).or_default().push(Arc::clone(entity)),
            (Postings::Long(_), _) => {}
        }
        Ok(())
    }

    /// Freezes the index, leaving this builder spent.
    pub fn build(&mut self) -> StoreResult<EntityIndex> {
        let postings = self
            .postings
            .take()
            .ok_or(StoreError::InvalidState("entity index builder already built"))?;
        debug!(attribute = %self.name, values = postings.len(), "built entity index");
        Ok(EntityIndex { name: self.name.clone(), kind: self.kind, postings })
    }
}

/// Immutable value → entities index for one attribute.

#[derive(Debug, Clone)]
pub struct EntityIndex {
    name: String,
    kind: Option<AttrType>,
    postings: Postings,
}

impl EntityIndex {
    /// Name of the indexed attribute.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared kind, or `None` if every value under the name was indexed.
    pub fn kind(&self) -> Option<AttrType> {
        self.kind
    }

    /// Groups of entities sharing a value, in no particular order.
    pub fn groups(&self) -> Vec<(Value, &[Arc<BasicEntity>])> {
        match &self.postings {
            Postings::Long(map) => map.iter().map(|(&v, es)| (Value::Long(v), es.as_slice())).collect(),
            Postings::Generic(map) => map.iter().map(|(v, es)| (v.clone(), es.as_slice())).collect(),
        }
    }

    /// Entities holding `value`, in insertion order; empty for unseen values.
    pub fn get_entities(&self, value: &Value) -> &[Arc<BasicEntity>] {
        let found = match (&self.postings, value) {
            (Postings::Long(map), Value::Long(v)) => map.get(v),
            (Postings::Long(_), _) => None,
            (Postings::Generic(map), _) => map.get(value),
        };
        found.map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct observed values, in no particular order.
    pub fn values(&self) -> Vec<Value> {
        match &self.postings {
            Postings::Long(map) => map.keys().map(|&v| Value::Long(v)).collect(),
            Postings::Generic(map) => map.keys().cloned().collect(),
        }
    }

    /// Number of distinct observed values.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    /// Returns `true` if no entity carried an indexable value.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
