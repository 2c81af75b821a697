//! # Engine Module
//!
//! Internal implementation of the packed entity store.
//!
//! This module contains all core building blocks, leaf-first:
//! - Shard encodings and sharded column storage
//! - Attribute schemas and entity values
//! - Column and entity indexes
//! - Packed, map and bare collections
//! - Column reductions
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod config;
pub mod shard;
pub mod storage;
pub mod attribute;
pub mod entity;
pub mod index;
pub mod entity_index;
pub mod packed;
pub mod collection;
pub mod reduce;
