//! Error types for shard storage, schema declaration, and collection building.
//!
//! This module declares focused, composable error types used across the
//! packed entity store. Each error carries enough context to make failures
//! actionable while remaining cheap to pass around or convert into the
//! aggregate [`StoreError`].
//!
//! ## Goals
//! * **Specificity:** Each struct models a single failure mode (a value of the
//!   wrong kind, a value that needs a wider encoding, an exhausted row space).
//! * **Ergonomics:** All errors derive [`thiserror::Error`] and provide `From`
//!   conversions into the aggregates, so `?` works across layers.
//! * **Actionability:** Messages name the offending value and the shard kind.
//!
//! ## Taxonomy
//! * Programmer / schema errors: [`ShardError::TypeMismatch`],
//!   [`StoreError::InvalidState`], [`SchemaError`].
//! * Documented limitations: [`StoreError::UnsupportedReplace`].
//! * Query-side misses: [`StoreError::NoSuchAttribute`] and
//!   [`StoreError::MissingValue`], raised only by the typed getters of row views.
//!
//! Dropping a duplicate id with `replace = false` is **not** an error; builders
//! report it through their `AddOutcome` return value.
//!
//! Internal inconsistencies (a column whose shard lengths disagree with its
//! declared size) are not represented here: they abort with a panic, because
//! they indicate a bug in the store rather than bad input.

use thiserror::Error;

use crate::engine::types::{AttrType, EntityID, Value};


/// Returned when a value's kind does not match the column family of a shard.
///
/// ### Example
/// ```ignore
/// // a text value handed to a long column
/// Err(TypeMismatchError { value: Value::from("x"), shard: "short-backed long" })
/// ```

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot store {value} ({kind}) in a {shard} shard", kind = value.kind())]
pub struct TypeMismatchError {

    /// The rejected value.
    pub value: Value,

    /// Human-readable name of the shard encoding.
    pub shard: &'static str,
}

/// Returned when a value has the right kind but does not fit the current
/// physical encoding of a shard.
///
/// Callers are expected to `adapt` the shard before writing; seeing this
/// error means that step was skipped.

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("value {value} does not fit a {shard} shard; adapt the shard first")]
pub struct UnrepresentableValueError {

    /// The value that needs a wider encoding.
    pub value: Value,

    /// Human-readable name of the shard encoding.
    pub shard: &'static str,
}

/// Returned when a slot index is outside a shard's fixed capacity.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("slot {slot} out of range (shard capacity {capacity})")]
pub struct SlotOutOfRangeError {

    /// Offending slot.
    pub slot: usize,

    /// Fixed shard capacity.
    pub capacity: usize,
}

/// Returned when a collection would exceed the addressable row space.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("row limit reached ({rows_needed} needed; capacity {capacity})")]
pub struct CapacityError {

    /// Rows the operation attempted to hold.
    pub rows_needed: u64,

    /// Current upper bound that prevented the operation.
    pub capacity: u64,
}

/// Aggregate error for shard and column writes.

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShardError {

    /// The value kind does not match the shard family.
    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatchError),

    /// The value needs a wider encoding.
    #[error(transparent)]
    Unrepresentable(#[from] UnrepresentableValueError),

    /// A slot index was outside the shard.
    #[error(transparent)]
    SlotOutOfRange(#[from] SlotOutOfRangeError),
}

/// Errors raised while declaring attribute sets or building entities.

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {

    /// Attribute 0 of a set must be the entity id attribute.
    #[error("attribute set does not start with the entity id attribute")]
    MissingEntityId,

    /// Attribute names in a set must be unique.
    #[error("duplicate attribute {0}")]
    DuplicateAttribute(String),

    /// The set is wider than the presence bitmask allows.
    #[error("too many attributes ({count}; at most {max})")]
    TooManyAttributes {
        /// Attributes requested.
        count: usize,
        /// Upper bound.
        max: usize,
    },

    /// An entity attribute was given a value of the wrong kind.
    #[error("attribute {attribute} expects {expected}, got {actual}")]
    ValueType {
        /// Attribute name.
        attribute: String,
        /// Declared kind.
        expected: AttrType,
        /// Kind of the supplied value.
        actual: AttrType,
    },

    /// A type name did not match any attribute kind.
    #[error("unknown attribute type {0:?}")]
    UnknownType(String),

    /// A textual value could not be parsed as the attribute's kind.
    #[error("cannot parse {input:?} as {expected} for attribute {attribute}")]
    Parse {
        /// Attribute name.
        attribute: String,
        /// Declared kind.
        expected: AttrType,
        /// Rejected input.
        input: String,
    },
}

/// Top-level error for collection builders and row views.

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {

    /// A shard or column rejected a write.
    #[error("shard write failed: {0}")]
    Shard(#[from] ShardError),

    /// The schema or an entity was malformed.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The collection ran out of row positions.
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// A builder was used after it had been finalized.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// A replace was requested for an id that is already packed into an
    /// out-of-order builder.
    #[error("packed builder cannot replace entity {id} once ids arrive out of order")]
    UnsupportedReplace {
        /// Duplicate id.
        id: EntityID,
    },

    /// The attribute is not part of the collection's schema.
    #[error("no such attribute: {0}")]
    NoSuchAttribute(String),

    /// The attribute exists but the entity has no value for it.
    #[error("entity {id} has no value for {attribute}")]
    MissingValue {
        /// Attribute name.
        attribute: String,
        /// Entity id.
        id: EntityID,
    },
}

/// Convenience result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
