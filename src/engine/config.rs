//! Tuning knobs for packed collections.

/// Default bound on memoized attribute subsets per collection.
pub const DEFAULT_ATTRIBUTE_SET_CACHE_LIMIT: usize = 64;

/// Configuration for [`PackedEntityCollectionBuilder`](crate::engine::packed::PackedEntityCollectionBuilder)
/// and the collections it builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackConfig {
    /// Build requested indexes concurrently on the rayon pool.
    pub parallel_indexing: bool,
    /// Maximum number of distinct missing-attribute subsets a built
    /// collection memoizes for its row views. Rows whose subset is not cached
    /// once the limit is hit still work; their subset is computed per call.
    pub attribute_set_cache_limit: usize,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            parallel_indexing: true,
            attribute_set_cache_limit: DEFAULT_ATTRIBUTE_SET_CACHE_LIMIT,
        }
    }
}

impl PackConfig {
    /// Creates a configuration with custom settings.
    pub fn new(parallel_indexing: bool, attribute_set_cache_limit: usize) -> Self {
        Self { parallel_indexing, attribute_set_cache_limit }
    }

    /// Builds indexes one after another on the calling thread.
    pub fn sequential() -> Self {
        Self { parallel_indexing: false, ..Self::default() }
    }
}
