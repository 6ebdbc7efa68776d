//! # annforest
//!
//! Approximate nearest-neighbor search over fixed-dimensional `f32` vectors
//! using a forest of random projection trees.
//!
//! This library provides:
//! - A flat point store populated by dense item ids
//! - Randomized binary space-partitioning trees, built in parallel
//! - A compact single-file on-disk image with memory-mapped loading
//! - Best-first forest traversal with exact re-ranking of candidates
//!
//! ## Example
//!
//! ```rust
//! use annforest::{AnnIndex, DistanceMetric};
//!
//! let mut index = AnnIndex::new(3, DistanceMetric::Euclidean);
//! index.set_seed(42).unwrap();
//! index.add_item(0, &[1.0, 0.0, 0.0]).unwrap();
//! index.add_item(1, &[0.0, 1.0, 0.0]).unwrap();
//! index.add_item(2, &[0.9, 0.1, 0.0]).unwrap();
//!
//! index.build(10).unwrap();
//!
//! let neighbors = index.nearest_by_vector(&[1.0, 0.0, 0.0], 2, None).unwrap();
//! assert_eq!(neighbors[0].id, 0);
//! ```

pub mod distance;
pub mod error;
pub mod forest;
pub mod index;
pub mod persistence;
pub mod queue;
pub mod rng;
pub mod search;
pub mod store;
pub mod tree;

pub use distance::{DistanceMetric, Hyperplane};
pub use error::{AnnError, Result};
pub use forest::Forest;
pub use index::AnnIndex;
pub use queue::Neighbor;
pub use rng::{RandomSource, DEFAULT_SEED};
pub use search::Searcher;
pub use store::PointStore;
pub use tree::{Node, Tree, TreeBuilder, DEFAULT_LEAF_CAPACITY};

/// CPU vector-width features this binary was compiled with.
///
/// Purely informational; distance kernels are scalar and rely on the
/// compiler to auto-vectorize for the listed targets.
pub fn compiled_features() -> Vec<&'static str> {
    let mut features = Vec::new();
    if cfg!(target_feature = "avx2") {
        features.push("avx2");
    }
    if cfg!(target_feature = "sse2") {
        features.push("sse2");
    }
    if cfg!(target_feature = "neon") {
        features.push("neon");
    }
    features
}
