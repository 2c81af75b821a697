//! Reduction primitives for vectorized column scans.
//!
//! This module defines **plain accumulator types** and the shard-parallel
//! driver used by
//! [`PackedEntityCollection::reduce_column`](crate::engine::packed::PackedEntityCollection::reduce_column)
//! and [`PackedEntityCollection::summarize`](crate::engine::packed::PackedEntityCollection::summarize).
//!
//! ## Execution model
//! A reduction proceeds in two phases:
//!
//! 1. **Parallel accumulation**
//!    * Each shard of the column is folded by one rayon task.
//!    * Each task starts from a fresh accumulator; absent slots are skipped.
//!
//! 2. **Deterministic combination**
//!    * Per-shard accumulators are merged with `combine` in shard order.
//!    * The result therefore does not depend on the thread count, even for
//!      floating-point sums.
//!
//! ## Provided accumulators
//!
//! * [`Count`]: counts present values.
//! * [`Sum`]: accumulates floating-point totals.
//! * [`MinMax`]: tracks minimum and maximum values.
//! * [`Welford`]: mean and variance with a numerically stable online
//!   algorithm.
//!
//! ## Usage example
//! ```
//! use packed_entities::prelude::*;
//! use packed_entities::reduce::{Sum, Welford};
//!
//! let attrs = AttributeSet::create([TypedName::double("rating")]).unwrap();
//! let mut builder = PackedEntityCollectionBuilder::new(EntityType::new("rating"), attrs);
//! for (id, r) in [(1, 3.5), (2, 4.0), (3, 5.0)] {
//!     let e = BasicEntity::builder(EntityType::new("rating"), id)
//!         .with(TypedName::double("rating"), r).unwrap()
//!         .build().unwrap();
//!     builder.add(&e, false).unwrap();
//! }
//! let ratings = builder.build().unwrap();
//!
//! let total = ratings.reduce_column("rating", Sum::default, |acc, v| acc.0 += v, |a, b| a.0 += b.0).unwrap();
//! assert_eq!(total.0, 12.5);
//!
//! let stats: Welford = ratings.summarize("rating").unwrap();
//! assert_eq!(stats.n, 3);
//! ```

use rayon::prelude::*;

use crate::engine::shard::Shard;


/// An accumulator that can be folded over numeric column values and merged
/// with other partial results.
pub trait Accumulator: Default + Send {
    /// Incorporates one present value.
    fn push(&mut self, x: f64);

    /// Merges a partial result computed over later rows.
    fn combine(&mut self, other: Self);
}

/// Accumulator that counts the number of present values.

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Count(pub u64);

impl Accumulator for Count {
    fn push(&mut self, _x: f64) {
        self.0 += 1;
    }

    fn combine(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Accumulator that computes a floating-point sum.
///
/// ## Semantics
/// Values are accumulated using standard floating-point addition. For large
/// or numerically sensitive columns, prefer [`Welford`].

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sum(pub f64);

impl Accumulator for Sum {
    fn push(&mut self, x: f64) {
        self.0 += x;
    }

    fn combine(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Accumulator that tracks minimum and maximum values.
///
/// ## Semantics
/// The default initializer sets:
/// * `min` to positive infinity
/// * `max` to negative infinity
///
/// allowing the first observed value to establish both bounds. An empty
/// column therefore reports `min > max`.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMax {
    /// Smallest observed value.
    pub min: f64,

    /// Largest observed value.
    pub max: f64,
}

impl Default for MinMax {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Accumulator for MinMax {
    fn push(&mut self, x: f64) {
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    fn combine(&mut self, other: Self) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

/// Accumulator implementing Welford’s online algorithm for mean and variance.
///
/// ## Semantics
/// Computes the mean and (sample) variance of a stream of values in a
/// numerically stable, single pass. Partial results are merged with the
/// pairwise update of Chan et al.
///
/// ## References
/// * Welford, B. P. (1962). *Note on a method for calculating corrected sums of
///   squares and products*.

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Welford {
    /// Number of samples processed.
    pub n: u64,

    /// Running mean.
    pub mean: f64,

    /// Sum of squared deviations from the mean.
    pub m2: f64,
}

impl Welford {
    /// Incorporates a new sample into the running statistics.
    pub fn push(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Returns the unbiased sample variance.
    pub fn variance(&self) -> f64 {
        if self.n > 1 {
            self.m2 / (self.n - 1) as f64
        } else {
            0.0
        }
    }
}

impl Accumulator for Welford {
    fn push(&mut self, x: f64) {
        Welford::push(self, x);
    }

    fn combine(&mut self, other: Self) {
        if other.n == 0 {
            return;
        }
        if self.n == 0 {
            *self = other;
            return;
        }
        let n = self.n + other.n;
        let delta = other.mean - self.mean;
        let mean = self.mean + delta * other.n as f64 / n as f64;
        let m2 = self.m2 + other.m2 + delta * delta * (self.n as f64 * other.n as f64) / n as f64;
        *self = Welford { n, mean, m2 };
    }
}

/// Folds every present numeric slot of `shards`, one rayon task per shard,
/// then combines the per-shard results in shard order.
///
/// Object shards contribute nothing.

pub fn reduce_shards<A, I, F, C>(shards: &[Shard], init: I, fold: F, combine: C) -> A
where
    A: Send,
    I: Fn() -> A + Sync,
    F: Fn(&mut A, f64) + Sync,
    C: Fn(&mut A, A),
{
    let partials: Vec<A> = shards
        .par_iter()
        .map(|shard| {
            let mut acc = init();
            for slot in 0..shard.len() {
                if let Some(v) = shard.get_f64(slot) {
                    fold(&mut acc, v);
                }
            }
            acc
        })
        .collect();

    let mut total = init();
    for partial in partials {
        combine(&mut total, partial);
    }
    total
}
