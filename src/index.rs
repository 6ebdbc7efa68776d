//! The index lifecycle: populate, build once, save/load, query.

use std::path::Path;

use crate::distance::DistanceMetric;
use crate::error::{AnnError, Result};
use crate::forest::{build_forest, Forest};
use crate::persistence::{format, image};
use crate::queue::Neighbor;
use crate::rng::DEFAULT_SEED;
use crate::search::Searcher;
use crate::store::PointStore;
use crate::tree::DEFAULT_LEAF_CAPACITY;

/// An approximate nearest-neighbor index over fixed-dimensional vectors.
///
/// Lifecycle: construct with a dimension and metric, optionally `set_seed`,
/// `add_item` repeatedly, `build` exactly once, then query and optionally
/// `save`. An index produced by [`AnnIndex::load`] is read-only: it answers
/// queries but rejects further mutation.
///
/// After build or load the index is immutable, so `&AnnIndex` queries are
/// safe from any number of threads concurrently.
#[derive(Debug)]
pub struct AnnIndex {
    store: PointStore,
    metric: DistanceMetric,
    seed: u64,
    leaf_capacity: usize,
    forest: Option<Forest>,
    loaded: bool,
}

impl AnnIndex {
    /// Create an empty index for vectors of the given dimension.
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        Self::with_leaf_capacity(dimension, metric, DEFAULT_LEAF_CAPACITY)
    }

    /// Create an empty index with a custom leaf capacity.
    pub fn with_leaf_capacity(
        dimension: usize,
        metric: DistanceMetric,
        leaf_capacity: usize,
    ) -> Self {
        Self {
            store: PointStore::new(dimension),
            metric,
            seed: DEFAULT_SEED,
            leaf_capacity: leaf_capacity.max(1),
            forest: None,
            loaded: false,
        }
    }

    /// Fix the random seed used for tree construction.
    ///
    /// Must be called before the first `add_item`; later calls are rejected
    /// so the seed unambiguously covers the whole build.
    pub fn set_seed(&mut self, seed: u64) -> Result<()> {
        if self.loaded || self.forest.is_some() {
            return Err(AnnError::invalid_state("set_seed after build or load"));
        }
        if !self.store.is_empty() {
            return Err(AnnError::invalid_state(
                "set_seed must precede the first add_item",
            ));
        }
        self.seed = seed;
        Ok(())
    }

    /// Add an item. Ids are dense and must arrive in order: `id` equals the
    /// current item count.
    pub fn add_item(&mut self, id: u32, vector: &[f32]) -> Result<()> {
        if self.loaded {
            return Err(AnnError::invalid_state("add_item on a loaded index"));
        }
        if self.forest.is_some() {
            return Err(AnnError::invalid_state("add_item after build"));
        }
        if id as usize != self.store.len() {
            return Err(AnnError::OutOfRangeId {
                id,
                count: self.store.len(),
            });
        }
        self.store.push(vector)?;
        Ok(())
    }

    /// Build the forest. Freezes the store; callable exactly once.
    pub fn build(&mut self, tree_count: usize) -> Result<()> {
        if self.loaded {
            return Err(AnnError::invalid_state("build on a loaded index"));
        }
        if self.forest.is_some() {
            return Err(AnnError::invalid_state("index is already built"));
        }
        if self.store.is_empty() {
            return Err(AnnError::invalid_state("build with no items"));
        }
        if tree_count == 0 {
            return Err(AnnError::invalid_state("tree_count must be at least 1"));
        }
        self.forest = Some(build_forest(
            &self.store,
            self.metric,
            tree_count,
            self.leaf_capacity,
            self.seed,
        ));
        Ok(())
    }

    /// Whether `build` has completed (or the index was loaded).
    pub fn is_built(&self) -> bool {
        self.forest.is_some()
    }

    /// Number of items.
    pub fn item_count(&self) -> usize {
        self.store.len()
    }

    /// Declared vector dimension.
    pub fn dimension(&self) -> usize {
        self.store.dimension()
    }

    /// Distance metric in use.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Seed the forest was (or will be) built with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of trees, once built.
    pub fn tree_count(&self) -> Option<usize> {
        self.forest.as_ref().map(Forest::tree_count)
    }

    /// Stored vector for an item id.
    pub fn item_vector(&self, id: u32) -> Result<&[f32]> {
        self.store.get(id).ok_or(AnnError::OutOfRangeId {
            id,
            count: self.store.len(),
        })
    }

    fn searcher(&self) -> Result<Searcher<'_>> {
        let forest = self
            .forest
            .as_ref()
            .ok_or_else(|| AnnError::invalid_state("query before build or load"))?;
        Ok(Searcher::new(&self.store, forest, self.metric))
    }

    /// The `k` approximate nearest neighbors of an arbitrary query vector,
    /// with distances, ascending. `search_k` bounds the candidate set;
    /// `None` means `tree_count * k`.
    pub fn nearest_by_vector(
        &self,
        query: &[f32],
        k: usize,
        search_k: Option<usize>,
    ) -> Result<Vec<Neighbor>> {
        self.searcher()?.nearest_by_vector(query, k, search_k)
    }

    /// The `k` approximate nearest neighbors of a stored item. The item is
    /// not excluded from its own results; callers wanting `k` true
    /// neighbors should ask for `k + 1` and drop the self match.
    pub fn nearest_by_item(
        &self,
        id: u32,
        k: usize,
        search_k: Option<usize>,
    ) -> Result<Vec<Neighbor>> {
        self.searcher()?.nearest_by_item(id, k, search_k)
    }

    /// Neighbor ids only, for callers that do not need distances.
    pub fn nearest_ids_by_vector(
        &self,
        query: &[f32],
        k: usize,
        search_k: Option<usize>,
    ) -> Result<Vec<u32>> {
        Ok(self
            .nearest_by_vector(query, k, search_k)?
            .into_iter()
            .map(|n| n.id)
            .collect())
    }

    /// Neighbor ids only, by stored item.
    pub fn nearest_ids_by_item(
        &self,
        id: u32,
        k: usize,
        search_k: Option<usize>,
    ) -> Result<Vec<u32>> {
        Ok(self
            .nearest_by_item(id, k, search_k)?
            .into_iter()
            .map(|n| n.id)
            .collect())
    }

    /// Serialize the built index into one contiguous image.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let forest = self
            .forest
            .as_ref()
            .ok_or_else(|| AnnError::invalid_state("save before build"))?;
        Ok(format::encode_index(
            &self.store,
            forest,
            self.metric,
            self.seed,
        ))
    }

    /// Save the built index to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        image::write_image(path, &bytes)
    }

    /// Reconstruct a read-only index from an in-memory image.
    pub fn from_bytes(
        bytes: &[u8],
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<Self> {
        let (store, forest, header) = format::decode_index(bytes, dimension, metric)?;
        Ok(Self {
            store,
            metric,
            seed: header.seed,
            leaf_capacity: DEFAULT_LEAF_CAPACITY,
            forest: Some(forest),
            loaded: true,
        })
    }

    /// Load a read-only index from a file. The caller states the expected
    /// dimension and metric; a disagreeing header is a `FormatError`.
    pub fn load(
        path: impl AsRef<Path>,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<Self> {
        let (store, forest, header) = image::read_image(path, dimension, metric)?;
        Ok(Self {
            store,
            metric,
            seed: header.seed,
            leaf_capacity: DEFAULT_LEAF_CAPACITY,
            forest: Some(forest),
            loaded: true,
        })
    }
}
