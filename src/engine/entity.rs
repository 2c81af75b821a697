//! Entities: the [`Entity`] trait, owned [`BasicEntity`] values and their
//! builder.

use std::fmt;
use std::sync::Arc;

use crate::engine::attribute::{AttributeSet, TypedName, ENTITY_ID};
use crate::engine::error::{SchemaError, StoreError, StoreResult};
use crate::engine::types::{AttrMask, AttrType, EntityID, Value};


/// Tag naming the kind of records a collection holds (`"rating"`, `"item"`, ...).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct EntityType(Arc<str>);

impl EntityType {
    /// Creates a type tag.
    pub fn new(name: impl Into<Arc<str>>) -> Self { Self(name.into()) }
    /// Tag text.
    #[inline] pub fn name(&self) -> &str { &self.0 }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// A typed record: an entity type, a unique id, and named attribute values.
///
/// Implemented by stand-alone [`BasicEntity`] values and by the lazy row
/// views handed out by collections. Lookups by name are type-strict only in
/// the `*_typed`/`*_value` accessors; [`get`](Entity::get) returns whatever the
/// attribute holds.

pub trait Entity {
    /// Type tag of the entity.
    fn entity_type(&self) -> EntityType;

    /// Unique id; also the value of [`ENTITY_ID`].
    fn id(&self) -> EntityID;

    /// Attributes this entity actually carries, id first.
    fn attribute_names(&self) -> AttributeSet;

    /// Value of `name`, or `None` if the entity does not carry it.
    fn get(&self, name: &str) -> Option<Value>;

    /// Returns `true` if [`get`](Entity::get) would return a value.
    fn has_attribute(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Value of `attr`, only if the entity carries it with the declared kind.
    fn get_typed(&self, attr: &TypedName) -> Option<Value> {
        self.get(attr.name()).filter(|v| attr.kind().accepts(v))
    }

    /// `long` value of `name`.
    ///
    /// # Errors
    /// [`StoreError::MissingValue`] when absent; [`SchemaError::ValueType`]
    /// when the attribute holds another kind.
    fn long_value(&self, name: &str) -> StoreResult<i64> {
        match self.get(name) {
            Some(Value::Long(v)) => Ok(v),
            Some(other) => Err(wrong_kind(name, AttrType::Long, &other)),
            None => Err(StoreError::MissingValue { attribute: name.to_string(), id: self.id() }),
        }
    }

    /// `double` value of `name`; errors as [`long_value`](Entity::long_value).
    fn double_value(&self, name: &str) -> StoreResult<f64> {
        match self.get(name) {
            Some(Value::Double(v)) => Ok(v),
            Some(other) => Err(wrong_kind(name, AttrType::Double, &other)),
            None => Err(StoreError::MissingValue { attribute: name.to_string(), id: self.id() }),
        }
    }

    /// Every carried attribute with its value, id first.
    fn attribute_values(&self) -> Vec<(TypedName, Value)> {
        self.attribute_names()
            .iter()
            .filter_map(|attr| self.get(attr.name()).map(|v| (attr.clone(), v)))
            .collect()
    }

    /// Copies this entity into a stand-alone [`BasicEntity`].
    fn to_basic(&self) -> BasicEntity {
        let names = self.attribute_names();
        let mut missing = AttrMask::default();
        let mut values = Vec::with_capacity(names.len());
        values.push(Value::Long(self.id()));
        for (i, attr) in names.iter().enumerate().skip(1) {
            match self.get(attr.name()) {
                Some(v) => values.push(v),
                None => missing.set(i),
            }
        }
        BasicEntity { entity_type: self.entity_type(), id: self.id(), attrs: names.without(missing), values }
    }
}

impl<E: Entity + ?Sized> Entity for &E {
    #[inline] fn entity_type(&self) -> EntityType { (**self).entity_type() }
    #[inline] fn id(&self) -> EntityID { (**self).id() }
    #[inline] fn attribute_names(&self) -> AttributeSet { (**self).attribute_names() }
    #[inline] fn get(&self, name: &str) -> Option<Value> { (**self).get(name) }
    #[inline] fn has_attribute(&self, name: &str) -> bool { (**self).has_attribute(name) }
    #[inline] fn get_typed(&self, attr: &TypedName) -> Option<Value> { (**self).get_typed(attr) }
    #[inline] fn long_value(&self, name: &str) -> StoreResult<i64> { (**self).long_value(name) }
    #[inline] fn double_value(&self, name: &str) -> StoreResult<f64> { (**self).double_value(name) }
    fn attribute_values(&self) -> Vec<(TypedName, Value)> { (**self).attribute_values() }
    fn to_basic(&self) -> BasicEntity { (**self).to_basic() }
}

fn wrong_kind(name: &str, expected: AttrType, value: &Value) -> StoreError {
    SchemaError::ValueType { attribute: name.to_string(), expected, actual: value.kind() }.into()
}

/// Owned entity with its values stored positionally against an [`AttributeSet`].
#[derive(Clone, Debug, PartialEq)]
pub struct BasicEntity {
    entity_type: EntityType,
    id: EntityID,
    attrs: AttributeSet,
    values: Vec<Value>,
}

impl BasicEntity {
    /// Shorthand for [`EntityBuilder::new`].
    pub fn builder(entity_type: EntityType, id: EntityID) -> EntityBuilder {
        EntityBuilder::new(entity_type, id)
    }

    /// An entity carrying nothing but its id.
    pub fn id_only(entity_type: EntityType, id: EntityID) -> Self {
        Self { entity_type, id, attrs: AttributeSet::id_only(), values: vec![Value::Long(id)] }
    }
}

impl Entity for BasicEntity {
    #[inline] fn entity_type(&self) -> EntityType { self.entity_type.clone() }
    #[inline] fn id(&self) -> EntityID { self.id }
    #[inline] fn attribute_names(&self) -> AttributeSet { self.attrs.clone() }

    fn get(&self, name: &str) -> Option<Value> {
        self.attrs.lookup(name).map(|i| self.values[i].clone())
    }

    fn attribute_values(&self) -> Vec<(TypedName, Value)> {
        self.attrs.iter().cloned().zip(self.values.iter().cloned()).collect()
    }

    fn to_basic(&self) -> BasicEntity { self.clone() }
}

/// Accumulates attribute values for a [`BasicEntity`].
///
/// Setting an attribute twice keeps the last value. Setting [`ENTITY_ID`]
/// changes the id.
#[derive(Clone, Debug)]
pub struct EntityBuilder {
    entity_type: EntityType,
    id: EntityID,
    values: Vec<(TypedName, Value)>,
}

impl EntityBuilder {
    /// Starts an entity carrying only `id`.
    pub fn new(entity_type: EntityType, id: EntityID) -> Self {
        Self { entity_type, id, values: Vec::new() }
    }

    /// Sets `attr` to `value`.
    ///
    /// # Errors
    /// [`SchemaError::ValueType`] if `value` does not have `attr`'s kind.
    pub fn set(&mut self, attr: TypedName, value: impl Into<Value>) -> Result<&mut Self, SchemaError> {
        let value = value.into();
        attr.check(&value)?;
        if attr.name() == ENTITY_ID {
            match value {
                Value::Long(id) if attr.is_entity_id() => self.id = id,
                _ => {
                    return Err(SchemaError::ValueType {
                        attribute: ENTITY_ID.to_string(),
                        expected: AttrType::Long,
                        actual: value.kind(),
                    })
                }
            }
            return Ok(self);
        }
        match self.values.iter_mut().find(|(a, _)| a.name() == attr.name()) {
            Some(slot) => *slot = (attr, value),
            None => self.values.push((attr, value)),
        }
        Ok(self)
    }

    /// Consuming form of [`set`](EntityBuilder::set), for chaining.
    pub fn with(mut self, attr: TypedName, value: impl Into<Value>) -> Result<Self, SchemaError> {
        self.set(attr, value)?;
        Ok(self)
    }

    /// Removes `name` if it was set.
    pub fn clear(&mut self, name: &str) -> &mut Self {
        self.values.retain(|(a, _)| a.name() != name);
        self
    }

    /// Snapshots the accumulated values into a [`BasicEntity`].
    pub fn build(&self) -> Result<BasicEntity, SchemaError> {
        let attrs = AttributeSet::create(self.values.iter().map(|(a, _)| a.clone()))?;
        let mut values = Vec::with_capacity(attrs.len());
        values.push(Value::Long(self.id));
        values.extend(self.values.iter().map(|(_, v)| v.clone()));
        Ok(BasicEntity { entity_type: self.entity_type.clone(), id: self.id, attrs, values })
    }
}
