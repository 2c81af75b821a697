//! # Attributes and Attribute Sets
//!
//! Typed attribute names and the ordered schemas built from them.
//!
//! ## Purpose
//! A [`TypedName`] pairs an attribute name with its declared [`AttrType`]. An
//! [`AttributeSet`] is an ordered, immutable list of typed names that serves
//! both as the schema of a collection and as the positional index into its
//! column arrays: "attribute `a`" always means position `a` in the set.
//!
//! ## Invariants
//! - Position 0 is always the entity id attribute ([`ENTITY_ID`], `long`).
//! - Names are unique within a set.
//! - A set holds at most [`MAX_ATTRIBUTES`] attributes, so presence of a
//!   row's attributes fits one [`AttrMask`].
//!
//! ## Sharing
//! Sets are reference counted; cloning one is a pointer copy. Row views of
//! a collection hand out clones of the collection's set (or of a memoized
//! subset) rather than rebuilding schemas per row.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::engine::error::SchemaError;
use crate::engine::types::{AttrID, AttrMask, AttrType, Value, MAX_ATTRIBUTES};


/// Name of the entity id attribute.
pub const ENTITY_ID: &str = "id";

/// An attribute name with its declared kind.
///
/// Two typed names are equal only if both the name and the kind match.

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypedName {
    name: Arc<str>,
    kind: AttrType,
}

impl TypedName {
    /// Creates a typed name.
    pub fn new(name: impl Into<Arc<str>>, kind: AttrType) -> Self {
        Self { name: name.into(), kind }
    }

    /// Creates a typed name from a textual kind such as `"long"` or `"string"`.
    pub fn parse(name: impl Into<Arc<str>>, type_name: &str) -> Result<Self, SchemaError> {
        Ok(Self::new(name, type_name.parse()?))
    }

    /// The entity id attribute.
    pub fn entity_id() -> Self {
        Self::long(ENTITY_ID)
    }

    /// A `long` attribute.
    pub fn long(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, AttrType::Long)
    }

    /// An `int` attribute.
    pub fn int(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, AttrType::Int)
    }

    /// A `double` attribute.
    pub fn double(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, AttrType::Double)
    }

    /// A `bool` attribute.
    pub fn boolean(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, AttrType::Bool)
    }

    /// A `text` attribute.
    pub fn text(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, AttrType::Text)
    }

    /// Attribute name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared value kind.
    #[inline]
    pub fn kind(&self) -> AttrType {
        self.kind
    }

    /// Returns `true` for the entity id attribute.
    #[inline]
    pub fn is_entity_id(&self) -> bool {
        &*self.name == ENTITY_ID && self.kind == AttrType::Long
    }

    /// Checks that `value` has this attribute's kind.
    pub fn check(&self, value: &Value) -> Result<(), SchemaError> {
        if self.kind.accepts(value) {
            Ok(())
        } else {
            Err(SchemaError::ValueType {
                attribute: self.name.to_string(),
                expected: self.kind,
                actual: value.kind(),
            })
        }
    }

    /// Parses `input` as a value of this attribute's kind.
    pub fn parse_value(&self, input: &str) -> Result<Value, SchemaError> {
        let trimmed = input.trim();
        let parsed = match self.kind {
            AttrType::Long => trimmed.parse().ok().map(Value::Long),
            AttrType::Int => trimmed.parse().ok().map(Value::Int),
            AttrType::Double => trimmed.parse().ok().map(Value::Double),
            AttrType::Bool => trimmed.parse().ok().map(Value::Bool),
            AttrType::Text => Some(Value::from(input)),
        };
        parsed.ok_or_else(|| SchemaError::Parse {
            attribute: self.name.to_string(),
            expected: self.kind,
            input: input.to_string(),
        })
    }
}

impl fmt::Display for TypedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedName[{}: {}]", self.name, self.kind)
    }
}

/// Well-known attributes of rating data.
pub mod common {
    use super::TypedName;

    /// User id.
    pub fn user() -> TypedName { TypedName::long("user") }
    /// Item id.
    pub fn item() -> TypedName { TypedName::long("item") }
    /// Rating value.
    pub fn rating() -> TypedName { TypedName::double("rating") }
    /// Event timestamp, in seconds.
    pub fn timestamp() -> TypedName { TypedName::long("timestamp") }
    /// Display name.
    pub fn name() -> TypedName { TypedName::text("name") }
    /// Occurrence count.
    pub fn count() -> TypedName { TypedName::int("count") }
}

struct SetInner {
    names: Vec<TypedName>,
    positions: FxHashMap<Arc<str>, AttrID>,
}

/// Ordered, immutable set of typed attribute names.
///
/// ## Example
/// ```
/// use packed_entities::{AttributeSet, TypedName, ENTITY_ID};
///
/// let attrs = AttributeSet::create([TypedName::long("user"), TypedName::double("rating")]).unwrap();
/// assert_eq!(attrs.len(), 3);
/// assert_eq!(attrs.attribute(0).name(), ENTITY_ID);
/// assert_eq!(attrs.lookup("rating"), Some(2));
/// ```

#[derive(Clone)]
pub struct AttributeSet {
    inner: Arc<SetInner>,
}

impl AttributeSet {
    /// Builds a set from `attrs`.
    ///
    /// The entity id attribute is placed at position 0; callers may list it
    /// first themselves or leave it out.
    ///
    /// # Errors
    /// - [`SchemaError::MissingEntityId`] if the id attribute appears anywhere
    ///   but first, or with a kind other than `long`,
    /// - [`SchemaError::DuplicateAttribute`] for a repeated name,
    /// - [`SchemaError::TooManyAttributes`] past [`MAX_ATTRIBUTES`].
    pub fn create<I>(attrs: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = TypedName>,
    {
        let id = TypedName::entity_id();
        let mut positions = FxHashMap::default();
        positions.insert(id.name.clone(), 0);
        let mut names = vec![id];

        for (i, attr) in attrs.into_iter().enumerate() {
            if attr.name() == ENTITY_ID {
                if i == 0 && attr.is_entity_id() {
                    continue;
                }
                return Err(SchemaError::MissingEntityId);
            }
            if positions.contains_key(&attr.name) {
                return Err(SchemaError::DuplicateAttribute(attr.name.to_string()));
            }
            positions.insert(attr.name.clone(), names.len());
            names.push(attr);
        }

        if names.len() > MAX_ATTRIBUTES {
            return Err(SchemaError::TooManyAttributes { count: names.len(), max: MAX_ATTRIBUTES });
        }
        Ok(Self { inner: Arc::new(SetInner { names, positions }) })
    }

    /// A set holding only the entity id attribute.
    pub fn id_only() -> Self {
        let id = TypedName::entity_id();
        let mut positions = FxHashMap::default();
        positions.insert(id.name.clone(), 0);
        Self { inner: Arc::new(SetInner { names: vec![id], positions }) }
    }

    /// Number of attributes, including the id.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.names.len()
    }

    /// Always `false`: every set holds the id attribute.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.names.is_empty()
    }

    /// Attribute at position `index`.
    ///
    /// # Panics
    /// If `index >= len()`.
    #[inline]
    pub fn attribute(&self, index: AttrID) -> &TypedName {
        &self.inner.names[index]
    }

    /// Attribute at position `index`, if any.
    #[inline]
    pub fn get(&self, index: AttrID) -> Option<&TypedName> {
        self.inner.names.get(index)
    }

    /// Position of the attribute called `name`.
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<AttrID> {
        self.inner.positions.get(name).copied()
    }

    /// Position of `name`, only if its declared kind matches as well.
    pub fn lookup_typed(&self, name: &TypedName) -> Option<AttrID> {
        self.lookup(name.name())
            .filter(|&i| self.inner.names[i].kind == name.kind)
    }

    /// Returns `true` if an attribute called `name` is present.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.positions.contains_key(name)
    }

    /// Iterates over the attributes in position order.
    pub fn iter(&self) -> std::slice::Iter<'_, TypedName> {
        self.inner.names.iter()
    }

    /// Iterates over the attribute names in position order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.inner.names.iter().map(TypedName::name)
    }

    /// The set without the positions flagged in `missing`.
    ///
    /// The id attribute is always kept.
    pub fn without(&self, missing: AttrMask) -> AttributeSet {
        if missing.is_empty() {
            return self.clone();
        }
        let mut positions = FxHashMap::default();
        let mut names = Vec::with_capacity(self.len());
        for (i, attr) in self.inner.names.iter().enumerate() {
            if i != 0 && missing.has(i) {
                continue;
            }
            positions.insert(attr.name.clone(), names.len());
            names.push(attr.clone());
        }
        Self { inner: Arc::new(SetInner { names, positions }) }
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.names == other.inner.names
    }
}

impl Eq for AttributeSet {}

impl fmt::Debug for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.names.iter().map(ToString::to_string)).finish()
    }
}

impl<'a> IntoIterator for &'a AttributeSet {
    type Item = &'a TypedName;
    type IntoIter = std::slice::Iter<'a, TypedName>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
