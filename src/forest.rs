//! Forest construction: independent trees built in parallel.

use rayon::prelude::*;

use crate::distance::DistanceMetric;
use crate::rng::RandomSource;
use crate::store::PointStore;
use crate::tree::{Tree, TreeBuilder};

/// An ordered collection of independently built trees.
///
/// Immutable once built; the searcher only needs the roots and read access
/// to the node arenas.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    trees: Vec<Tree>,
}

impl Forest {
    pub(crate) fn from_trees(trees: Vec<Tree>) -> Self {
        Self { trees }
    }

    /// Number of trees.
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Tree by position.
    pub fn tree(&self, index: usize) -> &Tree {
        &self.trees[index]
    }

    /// All trees in build order.
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }
}

/// Build `tree_count` trees over the store, one rayon task per tree.
///
/// Workers share only read access to the store and each consumes its own
/// RNG stream derived from `(seed, tree_index)`, so the result does not
/// depend on scheduling order. `collect` is the join barrier: the forest
/// exists only once every tree is complete.
pub fn build_forest(
    store: &PointStore,
    metric: DistanceMetric,
    tree_count: usize,
    leaf_capacity: usize,
    seed: u64,
) -> Forest {
    let trees: Vec<Tree> = (0..tree_count)
        .into_par_iter()
        .map(|i| {
            TreeBuilder::new(store, metric, leaf_capacity, RandomSource::for_tree(seed, i))
                .build()
        })
        .collect();
    Forest::from_trees(trees)
}
