//! # Entity collections
//!
//! The front door of the store. An [`EntityCollectionBuilder`] picks a
//! backing from the declared schema and produces an [`EntityCollection`]:
//!
//! | Builder constructor | Backing |
//! |---|---|
//! | [`EntityCollectionBuilder::new`] | [`MapEntityCollection`]: owned entities keyed by id, any attributes |
//! | [`EntityCollectionBuilder::with_attributes`], id only | [`BareEntityCollection`]: a sorted id list |
//! | [`EntityCollectionBuilder::with_attributes`], otherwise | [`PackedEntityCollection`]: packed columns |
//!
//! All three answer the same queries (`lookup`, `find`, `grouped`, iteration,
//! id set) and hand out [`EntityView`]s.
//!
//! ## Duplicate ids
//! Map and bare builders accept `replace = true` in any order: the last
//! entity added for an id wins. The packed builder's limits are described in
//! [`packed`](crate::engine::packed).

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::engine::attribute::{AttributeSet, TypedName, ENTITY_ID};
use crate::engine::config::PackConfig;
use crate::engine::entity::{BasicEntity, Entity, EntityType};
use crate::engine::entity_index::{EntityIndex, EntityIndexBuilder};
use crate::engine::error::StoreResult;
use crate::engine::packed::{AddOutcome, PackedEntityCollection, PackedEntityCollectionBuilder, RowEntity};
use crate::engine::types::{EntityID, Value};


// ─────────────────────────────────────────────────────────────────────────────
// Bare collections
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for a [`BareEntityCollection`]. Only ids are kept.
#[derive(Debug)]
pub struct BareEntityCollectionBuilder {
    entity_type: EntityType,
    ids: FxHashSet<EntityID>,
}

impl BareEntityCollectionBuilder {
    /// Creates an empty builder for entities of `entity_type`.
    pub fn new(entity_type: EntityType) -> Self {
        Self { entity_type, ids: FxHashSet::default() }
    }

    /// Number of distinct ids recorded so far.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if no id has been recorded.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Records the entity's id; every other attribute is discarded.
    pub fn add<E: Entity + ?Sized>(&mut self, entity: &E, replace: bool) -> AddOutcome {
        match (self.ids.insert(entity.id()), replace) {
            (true, _) => AddOutcome::Added,
            (false, true) => AddOutcome::Replaced,
            (false, false) => AddOutcome::Dropped,
        }
    }

    /// Sorts the recorded ids and freezes them.
    pub fn build(self) -> BareEntityCollection {
        let mut ids: Vec<EntityID> = self.ids.into_iter().collect();
        ids.sort_unstable();
        debug!(entity_type = %self.entity_type, entities = ids.len(), "built bare collection");
        BareEntityCollection { entity_type: self.entity_type, ids }
    }
}

/// Collection of id-only entities.
#[derive(Debug, Clone)]
pub struct BareEntityCollection {
    entity_type: EntityType,
    ids: Vec<EntityID>,
}

impl BareEntityCollection {
    /// Entity type of every member.
    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the collection holds no entities.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ascending ids.
    pub fn ids(&self) -> &[EntityID] {
        &self.ids
    }

    /// Returns `true` if `id` is a member.
    pub fn contains(&self, id: EntityID) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    fn entity(&self, id: EntityID) -> BasicEntity {
        BasicEntity::id_only(self.entity_type.clone(), id)
    }

    /// Id-only entity for `id`, if it is a member.
    pub fn lookup(&self, id: EntityID) -> Option<BasicEntity> {
        self.contains(id).then(|| self.entity(id))
    }

    /// Only the id attribute can match.
    pub fn find(&self, name: &str, value: &Value) -> Vec<BasicEntity> {
        match (name, value) {
            (ENTITY_ID, Value::Long(id)) => self.lookup(*id).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Id-only entities, ascending by id.
    pub fn iter(&self) -> impl Iterator<Item = BasicEntity> + '_ {
        self.ids.iter().map(|&id| self.entity(id))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Map collections
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for a [`MapEntityCollection`].
///
/// Indexes requested with [`add_index`](Self::add_index) are built from the
/// final entities when the collection is built.
#[derive(Debug)]
pub struct MapEntityCollectionBuilder {
    entity_type: EntityType,
    entities: FxHashMap<EntityID, Arc<BasicEntity>>,
    indexes: Vec<EntityIndexBuilder>,
}

impl MapEntityCollectionBuilder {
    /// Creates an empty builder for entities of `entity_type`.
    pub fn new(entity_type: EntityType) -> Self {
        Self { entity_type, entities: FxHashMap::default(), indexes: Vec::new() }
    }

    /// Requests an index over every value stored under `name`. It serves
    /// [`find`](MapEntityCollection::find) and
    /// [`grouped`](MapEntityCollection::grouped).
    pub fn add_index(&mut self, name: &str) -> &mut Self {
        if !self.indexes.iter().any(|b| b.name() == name && b.kind().is_none()) {
            self.indexes.push(EntityIndexBuilder::by_name(name));
        }
        self
    }

    /// Requests an index over `attr` that holds only values of its kind. It
    /// serves [`find_typed`](MapEntityCollection::find_typed) only.
    pub fn add_index_typed(&mut self, attr: &TypedName) -> &mut Self {
        self.indexes.retain(|b| !(b.name() == attr.name() && b.kind().is_some()));
        self.indexes.push(EntityIndexBuilder::new(attr));
        self
    }

    /// Number of distinct ids added so far.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Stores a copy of `entity`. A repeated id is overwritten when
    /// `replace` is set and dropped otherwise.
    pub fn add<E: Entity + ?Sized>(&mut self, entity: &E, replace: bool) -> AddOutcome {
        let id = entity.id();
        match self.entities.get_mut(&id) {
            Some(slot) if replace => {
                *slot = Arc::new(entity.to_basic());
                AddOutcome::Replaced
            }
            Some(_) => {
                trace!(entity_type = %self.entity_type, id, "dropped duplicate entity");
                AddOutcome::Dropped
            }
            None => {
                self.entities.insert(id, Arc::new(entity.to_basic()));
                AddOutcome::Added
            }
        }
    }

    /// Sorts the entities by id and builds every requested index.
    pub fn build(mut self) -> StoreResult<MapEntityCollection> {
        let mut entities: Vec<Arc<BasicEntity>> = self.entities.into_values().collect();
        entities.sort_unstable_by_key(|e| e.id());
        let positions = entities.iter().enumerate().map(|(p, e)| (e.id(), p)).collect();

        let mut indexes = FxHashMap::default();
        let mut typed_indexes = FxHashMap::default();
        for builder in &mut self.indexes {
            for entity in &entities {
                builder.add(entity)?;
            }
            let index = builder.build()?;
            let target = if index.kind().is_some() { &mut typed_indexes } else { &mut indexes };
            target.insert(index.name().to_string(), index);
        }
        debug!(
            entity_type = %self.entity_type,
            entities = entities.len(),
            indexes = indexes.len() + typed_indexes.len(),
            "built map collection"
        );
        Ok(MapEntityCollection { entity_type: self.entity_type, entities, positions, indexes, typed_indexes })
    }
}

/// Collection of owned entities, sorted by id, with optional attribute
/// indexes.
#[derive(Debug, Clone)]
pub struct MapEntityCollection {
    entity_type: EntityType,
    entities: Vec<Arc<BasicEntity>>,
    positions: FxHashMap<EntityID, usize>,
    indexes: FxHashMap<String, EntityIndex>,
    typed_indexes: FxHashMap<String, EntityIndex>,
}

impl MapEntityCollection {
    /// Entity type of every member.
    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the collection holds no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity with `id`, if any.
    pub fn lookup(&self, id: EntityID) -> Option<&BasicEntity> {
        self.positions.get(&id).map(|&p| &*self.entities[p])
    }

    /// Returns `true` if `id` is a member.
    pub fn contains(&self, id: EntityID) -> bool {
        self.positions.contains_key(&id)
    }

    /// Entities whose `name` attribute equals `value`, ascending by id.
    pub fn find(&self, name: &str, value: &Value) -> Vec<&BasicEntity> {
        if let Some(index) = self.indexes.get(name) {
            return index.get_entities(value).iter().map(|e| &**e).collect();
        }
        self.entities
            .iter()
            .filter(|e| e.get(name).as_ref() == Some(value))
            .map(|e| &**e)
            .collect()
    }

    /// Like [`find`](Self::find), matching only values of `attr`'s kind.
    pub fn find_typed(&self, attr: &TypedName, value: &Value) -> Vec<&BasicEntity> {
        if !attr.kind().accepts(value) {
            return Vec::new();
        }
        match self.typed_indexes.get(attr.name()) {
            Some(index) if index.kind() == Some(attr.kind()) => {
                index.get_entities(value).iter().map(|e| &**e).collect()
            }
            _ => self.find(attr.name(), value),
        }
    }

    /// Groups entities by their value of `name`.
    pub fn grouped(&self, name: &str) -> FxHashMap<Value, Vec<&BasicEntity>> {
        if let Some(index) = self.indexes.get(name) {
            return index
                .groups()
                .into_iter()
                .map(|(v, es)| (v, es.iter().map(|e| &**e).collect()))
                .collect();
        }
        let mut groups: FxHashMap<Value, Vec<&BasicEntity>> = FxHashMap::default();
        for entity in &self.entities {
            if let Some(v) = entity.get(name) {
                groups.entry(v).or_default().push(entity);
            }
        }
        groups
    }

    /// Entities ascending by id.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &BasicEntity> + '_ {
        self.entities.iter().map(|e| &**e)
    }

    /// Ascending ids.
    pub fn ids(&self) -> impl ExactSizeIterator<Item = EntityID> + '_ {
        self.entities.iter().map(|e| e.id())
    }

    /// Always the entity id.
    pub fn sort_keys(&self) -> Vec<TypedName> {
        vec![TypedName::entity_id()]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Unified front door
// ─────────────────────────────────────────────────────────────────────────────

/// An entity handed out by any [`EntityCollection`].
#[derive(Debug, Clone)]
pub enum EntityView<'a> {
    /// Lazy row of a packed collection.
    Row(RowEntity<'a>),
    /// Entity owned by a map collection.
    Borrowed(&'a BasicEntity),
    /// Id-only entity of a bare collection.
    Owned(BasicEntity),
}

impl EntityView<'_> {
    fn entity(&self) -> &dyn Entity {
        match self {
            EntityView::Row(row) => row,
            EntityView::Borrowed(e) => *e,
            EntityView::Owned(e) => e,
        }
    }
}

impl Entity for EntityView<'_> {
    fn entity_type(&self) -> EntityType { self.entity().entity_type() }
    fn id(&self) -> EntityID { self.entity().id() }
    fn attribute_names(&self) -> AttributeSet { self.entity().attribute_names() }
    fn get(&self, name: &str) -> Option<Value> { self.entity().get(name) }
    fn has_attribute(&self, name: &str) -> bool { self.entity().has_attribute(name) }
    fn get_typed(&self, attr: &TypedName) -> Option<Value> { self.entity().get_typed(attr) }
    fn long_value(&self, name: &str) -> StoreResult<i64> { self.entity().long_value(name) }
    fn double_value(&self, name: &str) -> StoreResult<f64> { self.entity().double_value(name) }
    fn attribute_values(&self) -> Vec<(TypedName, Value)> { self.entity().attribute_values() }
    fn to_basic(&self) -> BasicEntity { self.entity().to_basic() }
}

/// A built collection of entities of one type.
#[derive(Debug)]
pub enum EntityCollection {
    /// Packed columns.
    Packed(PackedEntityCollection),
    /// Owned entities keyed by id.
    Map(MapEntityCollection),
    /// Ids only.
    Bare(BareEntityCollection),
}

impl EntityCollection {
    /// Entity type of every member.
    pub fn entity_type(&self) -> &EntityType {
        match self {
            EntityCollection::Packed(c) => c.entity_type(),
            EntityCollection::Map(c) => c.entity_type(),
            EntityCollection::Bare(c) => c.entity_type(),
        }
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        match self {
            EntityCollection::Packed(c) => c.len(),
            EntityCollection::Map(c) => c.len(),
            EntityCollection::Bare(c) => c.len(),
        }
    }

    /// Returns `true` if the collection holds no entities.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entity with `id`, if any.
    pub fn lookup(&self, id: EntityID) -> Option<EntityView<'_>> {
        match self {
            EntityCollection::Packed(c) => c.lookup(id).map(EntityView::Row),
            EntityCollection::Map(c) => c.lookup(id).map(EntityView::Borrowed),
            EntityCollection::Bare(c) => c.lookup(id).map(EntityView::Owned),
        }
    }

    /// Returns `true` if `id` is a member.
    pub fn contains(&self, id: EntityID) -> bool {
        match self {
            EntityCollection::Packed(c) => c.contains(id),
            EntityCollection::Map(c) => c.contains(id),
            EntityCollection::Bare(c) => c.contains(id),
        }
    }

    /// Entities whose `name` attribute equals `value`, ascending by id.
    pub fn find(&self, name: &str, value: &Value) -> Vec<EntityView<'_>> {
        match self {
            EntityCollection::Packed(c) => c.find(name, value).into_iter().map(EntityView::Row).collect(),
            EntityCollection::Map(c) => c.find(name, value).into_iter().map(EntityView::Borrowed).collect(),
            EntityCollection::Bare(c) => c.find(name, value).into_iter().map(EntityView::Owned).collect(),
        }
    }

    /// Groups entities by their value of `name`.
    pub fn grouped(&self, name: &str) -> FxHashMap<Value, Vec<EntityView<'_>>> {
        match self {
            EntityCollection::Packed(c) => c
                .grouped(name)
                .into_iter()
                .map(|(v, rows)| (v, rows.into_iter().map(EntityView::Row).collect()))
                .collect(),
            EntityCollection::Map(c) => c
                .grouped(name)
                .into_iter()
                .map(|(v, es)| (v, es.into_iter().map(EntityView::Borrowed).collect()))
                .collect(),
            EntityCollection::Bare(c) if name == ENTITY_ID => {
                c.iter().map(|e| (Value::Long(e.id()), vec![EntityView::Owned(e)])).collect()
            }
            EntityCollection::Bare(_) => FxHashMap::default(),
        }
    }

    /// Every entity, ascending by id.
    pub fn iter(&self) -> Box<dyn Iterator<Item = EntityView<'_>> + '_> {
        match self {
            EntityCollection::Packed(c) => Box::new(c.iter().map(EntityView::Row)),
            EntityCollection::Map(c) => Box::new(c.iter().map(EntityView::Borrowed)),
            EntityCollection::Bare(c) => Box::new(c.iter().map(EntityView::Owned)),
        }
    }

    /// Ascending ids.
    pub fn id_set(&self) -> Vec<EntityID> {
        match self {
            EntityCollection::Packed(c) => c.id_set().to_vec(),
            EntityCollection::Map(c) => c.ids().collect(),
            EntityCollection::Bare(c) => c.ids().to_vec(),
        }
    }

    /// Attributes the entities are ordered by.
    pub fn sort_keys(&self) -> Vec<TypedName> {
        match self {
            EntityCollection::Packed(c) => c.sort_keys(),
            EntityCollection::Map(c) => c.sort_keys(),
            EntityCollection::Bare(_) => vec![TypedName::entity_id()],
        }
    }

    /// The packed backing, if this collection has one.
    pub fn as_packed(&self) -> Option<&PackedEntityCollection> {
        match self {
            EntityCollection::Packed(c) => Some(c),
            _ => None,
        }
    }
}

/// Builder for an [`EntityCollection`], dispatching on the schema.
#[derive(Debug)]
pub enum EntityCollectionBuilder {
    /// Builds a [`PackedEntityCollection`].
    Packed(PackedEntityCollectionBuilder),
    /// Builds a [`MapEntityCollection`].
    Map(MapEntityCollectionBuilder),
    /// Builds a [`BareEntityCollection`].
    Bare(BareEntityCollectionBuilder),
}

impl EntityCollectionBuilder {
    /// Builder for entities with arbitrary attributes.
    pub fn new(entity_type: EntityType) -> Self {
        EntityCollectionBuilder::Map(MapEntityCollectionBuilder::new(entity_type))
    }

    /// Builder for entities restricted to `attributes`.
    pub fn with_attributes(entity_type: EntityType, attributes: AttributeSet) -> Self {
        if attributes.len() == 1 {
            EntityCollectionBuilder::Bare(BareEntityCollectionBuilder::new(entity_type))
        } else {
            EntityCollectionBuilder::Packed(PackedEntityCollectionBuilder::new(entity_type, attributes))
        }
    }

    /// Applies `config` to a packed builder; other backings ignore it.
    pub fn with_config(self, config: PackConfig) -> Self {
        match self {
            EntityCollectionBuilder::Packed(b) => EntityCollectionBuilder::Packed(b.with_config(config)),
            other => other,
        }
    }

    /// Requests an index on `name`. Bare collections ignore it.
    pub fn add_index(&mut self, name: &str) -> &mut Self {
        match self {
            EntityCollectionBuilder::Packed(b) => {
                b.add_index(name);
            }
            EntityCollectionBuilder::Map(b) => {
                b.add_index(name);
            }
            EntityCollectionBuilder::Bare(_) => {}
        }
        self
    }

    /// Number of entities accepted so far.
    pub fn len(&self) -> usize {
        match self {
            EntityCollectionBuilder::Packed(b) => b.len(),
            EntityCollectionBuilder::Map(b) => b.len(),
            EntityCollectionBuilder::Bare(b) => b.len(),
        }
    }

    /// Returns `true` if nothing has been accepted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds `entity`, dispatching to the backing builder.
    ///
    /// # Errors
    /// Only the packed backing can fail; see
    /// [`PackedEntityCollectionBuilder::add`].
    pub fn add<E: Entity + ?Sized>(&mut self, entity: &E, replace: bool) -> StoreResult<AddOutcome> {
        match self {
            EntityCollectionBuilder::Packed(b) => b.add(entity, replace),
            EntityCollectionBuilder::Map(b) => Ok(b.add(entity, replace)),
            EntityCollectionBuilder::Bare(b) => Ok(b.add(entity, replace)),
        }
    }

    /// Adds every entity of `entities` with `replace = false`.
    pub fn add_all<'e, E, I>(&mut self, entities: I) -> StoreResult<()>
    where
        E: Entity + 'e,
        I: IntoIterator<Item = &'e E>,
    {
        for entity in entities {
            self.add(entity, false)?;
        }
        Ok(())
    }

    /// Freezes the backing builder.
    pub fn build(self) -> StoreResult<EntityCollection> {
        Ok(match self {
            EntityCollectionBuilder::Packed(b) => EntityCollection::Packed(b.build()?),
            EntityCollectionBuilder::Map(b) => EntityCollection::Map(b.build()?),
            EntityCollectionBuilder::Bare(b) => EntityCollection::Bare(b.build()),
        })
    }
}
