//! # Packed Entities
//!
//! In-memory, read-mostly store for typed entity records, packed into
//! adaptively encoded columns.
//!
//! ## Design Goals
//! - Column shards that start compact and widen only when the data demands it
//! - Id lookup by binary search over a sorted id column
//! - Optional per-attribute indexes with a scan fallback that gives identical results
//! - Lazy row views; nothing is copied out of the columns until asked for
//! - Immutable once built, so collections are shared freely across threads
//!
//! ## Example
//! ```
//! use packed_entities::prelude::*;
//!
//! let ratings = EntityType::new("rating");
//! let attrs = AttributeSet::create([TypedName::long("user"), TypedName::double("rating")]).unwrap();
//!
//! let mut builder = PackedEntityCollectionBuilder::new(ratings.clone(), attrs);
//! builder.add_index("user");
//! for (id, user, rating) in [(3, 10, 4.5), (1, 10, 3.0), (2, 11, 5.0)] {
//!     let e = BasicEntity::builder(ratings.clone(), id)
//!         .with(TypedName::long("user"), user as i64).unwrap()
//!         .with(TypedName::double("rating"), rating).unwrap()
//!         .build().unwrap();
//!     builder.add(&e, false).unwrap();
//! }
//! let collection = builder.build().unwrap();
//!
//! assert_eq!(collection.lookup(2).unwrap().double_value("rating").unwrap(), 5.0);
//! assert_eq!(collection.find("user", &Value::Long(10)).len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]
#![deny(dead_code)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Collections

pub use engine::packed::{
    AddOutcome,
    CollectionDescription,
    ColumnView,
    IdSet,
    PackedEntityCollection,
    PackedEntityCollectionBuilder,
    RowEntity,
    MAX_ROWS,
};

pub use engine::collection::{
    BareEntityCollection,
    BareEntityCollectionBuilder,
    EntityCollection,
    EntityCollectionBuilder,
    EntityView,
    MapEntityCollection,
    MapEntityCollectionBuilder,
};

pub use engine::config::PackConfig;

// Schema and entities

pub use engine::attribute::{
    common,
    AttributeSet,
    TypedName,
    ENTITY_ID,
};

pub use engine::entity::{
    BasicEntity,
    Entity,
    EntityBuilder,
    EntityType,
};

// Storage

pub use engine::shard::{Shard, ShardEncoding};
pub use engine::storage::{AttrStore, AttrStoreBuilder};
pub use engine::index::{PackIndex, PackIndexBuilder};
pub use engine::entity_index::{EntityIndex, EntityIndexBuilder};
pub use engine::reduce;

pub use engine::error::{
    CapacityError,
    SchemaError,
    ShardError,
    SlotOutOfRangeError,
    StoreError,
    StoreResult,
    TypeMismatchError,
    UnrepresentableValueError,
};

pub use engine::types::{
    AttrID,
    AttrMask,
    AttrType,
    EntityID,
    RowID,
    Value,
    SHARD_BITS,
    SHARD_SIZE,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used types.
///
/// Import with:
/// ```rust
/// use packed_entities::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AddOutcome,
        AttrType,
        AttributeSet,
        BasicEntity,
        Entity,
        EntityCollection,
        EntityCollectionBuilder,
        EntityType,
        PackConfig,
        PackedEntityCollection,
        PackedEntityCollectionBuilder,
        StoreError,
        StoreResult,
        TypedName,
        Value,
        ENTITY_ID,
    };
}
