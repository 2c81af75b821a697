//! Core Store Types, Identifiers, and Shard Geometry
//!
//! This module defines the **fundamental types, identifiers, shard layout, and
//! value model** used throughout the packed entity store. These definitions
//! are shared by every layer: shards, columns, indexes, and collections.
//!
//! ## Design Philosophy
//!
//! The store is designed around:
//!
//! - **Fixed-size shards** addressed by shifting and masking a row index,
//! - **A closed set of attribute kinds** resolved once, when a schema is declared,
//! - **Small copyable identifiers** for entities, rows, and attributes,
//! - **Bitmask bookkeeping** for attribute presence.
//!
//! ## Shard Geometry
//!
//! A logical row index `i` within a column is split into:
//!
//! ```text
//! | shard (i >> SHARD_BITS) | slot (i & SHARD_MASK) |
//! ```
//!
//! Every shard except the last one in a column holds exactly [`SHARD_SIZE`]
//! slots.
//!
//! ## Values
//!
//! [`Value`] is the dynamically-typed payload carried by entity attributes.
//! Its variants line up one-to-one with [`AttrType`]. Equality and hashing of
//! doubles is bit-exact so that every value can act as an index key.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use crate::engine::error::SchemaError;


/// Bit-width type used for compile-time layout calculations.
pub type Bits = u32;

/// Numeric identifier of an entity. Unique within a collection.
pub type EntityID = i64;
/// Row position of an entity inside a packed collection.
pub type RowID = u32;
/// Position of an attribute inside an [`AttributeSet`](crate::engine::attribute::AttributeSet).
pub type AttrID = usize;

/// Number of bits addressing a slot within a shard.
pub const SHARD_BITS: Bits = 12;
/// Number of slots per shard.
pub const SHARD_SIZE: usize = 1 << SHARD_BITS;
/// Mask selecting the slot portion of a row index.
pub const SHARD_MASK: usize = SHARD_SIZE - 1;

/// Maximum number of attributes in one attribute set.
///
/// Bounded by the width of [`AttrMask`].
pub const MAX_ATTRIBUTES: usize = 64;

const _: [(); 1] = [(); (SHARD_BITS > 0 && SHARD_BITS < 16) as usize];
const _: [(); 1] = [(); (MAX_ATTRIBUTES <= u64::BITS as usize) as usize];

/// Returns the shard holding logical row `index`.
#[inline]
pub const fn shard_of(index: usize) -> usize {
    index >> SHARD_BITS
}

/// Returns the slot of logical row `index` within its shard.
#[inline]
pub const fn slot_of(index: usize) -> usize {
    index & SHARD_MASK
}

/// Bitset over attribute positions.
///
/// Used to describe which attributes of a row are absent; the mask doubles as
/// the key of the per-collection attribute-subset memo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AttrMask(u64);

impl AttrMask {
    /// Sets the bit for `attr`.
    #[inline]
    pub fn set(&mut self, attr: AttrID) {
        debug_assert!(attr < MAX_ATTRIBUTES);
        self.0 |= 1u64 << attr;
    }

    /// Clears the bit for `attr`.
    #[inline]
    pub fn clear(&mut self, attr: AttrID) {
        debug_assert!(attr < MAX_ATTRIBUTES);
        self.0 &= !(1u64 << attr);
    }

    /// Returns `true` if the bit for `attr` is set.
    #[inline]
    pub fn has(&self, attr: AttrID) -> bool {
        attr < MAX_ATTRIBUTES && (self.0 >> attr) & 1 == 1
    }

    /// Returns `true` if no bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of set bits.
    #[inline]
    pub fn count(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates over the attribute positions set in this mask, ascending.
    pub fn iter(&self) -> impl Iterator<Item = AttrID> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let tz = bits.trailing_zeros() as AttrID;
            bits &= bits - 1;
            Some(tz)
        })
    }
}

/// Declared kind of an attribute.
///
/// The kind is fixed when the schema is declared and selects the shard
/// family used by the attribute's column:
///
/// - `Long`, `Int`: integer ladder (short → int → long),
/// - `Double`: fixed-point byte, promoted to full double,
/// - `Bool`, `Text`: boxed object slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttrType {
    /// 64-bit signed integer.
    Long,
    /// 32-bit signed integer.
    Int,
    /// 64-bit float.
    Double,
    /// Boolean flag.
    Bool,
    /// Shared immutable string.
    Text,
}

impl AttrType {
    /// Returns `true` if `value` has this kind.
    #[inline]
    pub fn accepts(self, value: &Value) -> bool {
        value.kind() == self
    }

    /// Short lowercase name, used in messages.
    pub fn name(self) -> &'static str {
        match self {
            AttrType::Long => "long",
            AttrType::Int => "int",
            AttrType::Double => "double",
            AttrType::Bool => "bool",
            AttrType::Text => "text",
        }
    }
}

impl FromStr for AttrType {
    type Err = SchemaError;

    /// Accepts the lowercase kind names plus a few common aliases
    /// (`i64`, `i32`, `f64`, `string`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "long" | "i64" => Ok(AttrType::Long),
            "int" | "integer" | "i32" => Ok(AttrType::Int),
            "double" | "f64" | "real" => Ok(AttrType::Double),
            "bool" | "boolean" => Ok(AttrType::Bool),
            "text" | "string" | "str" => Ok(AttrType::Text),
            _ => Err(SchemaError::UnknownType(s.to_string())),
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single attribute value.
#[derive(Clone, Debug)]
pub enum Value {
    /// 64-bit signed integer.
    Long(i64),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit float; compared and hashed by bit pattern.
    Double(f64),
    /// Boolean flag.
    Bool(bool),
    /// Shared immutable string.
    Text(Arc<str>),
}

impl Value {
    /// Kind of this value.
    #[inline]
    pub fn kind(&self) -> AttrType {
        match self {
            Value::Long(_) => AttrType::Long,
            Value::Int(_) => AttrType::Int,
            Value::Double(_) => AttrType::Double,
            Value::Bool(_) => AttrType::Bool,
            Value::Text(_) => AttrType::Text,
        }
    }

    /// Returns the payload of a `Long` value.
    #[inline]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the payload of an `Int` value.
    #[inline]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the payload of a `Double` value.
    #[inline]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the payload of a `Bool` value.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the payload of a `Text` value.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric view of the value; `None` for booleans and text.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Long(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Bool(_) | Value::Text(_) => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Long(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Bool(v) => v.hash(state),
            Value::Text(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Long(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::Long(v) }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self { Value::Int(v) }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Double(v) }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Bool(v) }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::Text(Arc::from(v)) }
}

impl From<String> for Value {
    fn from(v: String) -> Self { Value::Text(Arc::from(v)) }
}

impl From<Arc<str>> for Value {
    fn from(v: Arc<str>) -> Self { Value::Text(v) }
}
