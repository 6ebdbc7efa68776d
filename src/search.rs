//! Forest traversal and top-K ranking.

use std::collections::{BinaryHeap, HashSet};

use crate::distance::DistanceMetric;
use crate::error::{AnnError, Result};
use crate::forest::Forest;
use crate::queue::{Neighbor, TraversalEntry};
use crate::store::PointStore;
use crate::tree::Node;

/// Read-only view over a built index that answers nearest-neighbor queries.
///
/// Holds only shared references, so any number of searchers can run
/// concurrently over the same index.
pub struct Searcher<'a> {
    store: &'a PointStore,
    forest: &'a Forest,
    metric: DistanceMetric,
}

impl<'a> Searcher<'a> {
    pub fn new(store: &'a PointStore, forest: &'a Forest, metric: DistanceMetric) -> Self {
        Self {
            store,
            forest,
            metric,
        }
    }

    /// Effective candidate budget: explicit `search_k`, or `tree_count * k`,
    /// never less than `k` itself.
    fn effective_search_k(&self, k: usize, search_k: Option<usize>) -> usize {
        search_k
            .unwrap_or_else(|| self.forest.tree_count().saturating_mul(k))
            .max(k)
    }

    /// Find the `k` approximate nearest neighbors of `query`, ascending by
    /// distance with ties broken by item id.
    pub fn nearest_by_vector(
        &self,
        query: &[f32],
        k: usize,
        search_k: Option<usize>,
    ) -> Result<Vec<Neighbor>> {
        if query.len() != self.store.dimension() {
            return Err(AnnError::DimensionMismatch {
                expected: self.store.dimension(),
                actual: query.len(),
            });
        }

        let budget = self.effective_search_k(k, search_k);
        let mut candidates = self.gather_candidates(query, budget);

        // Exact re-rank of the candidate set. Sorting ids first makes the
        // output independent of hash iteration order.
        candidates.sort_unstable();
        let mut ranked: Vec<Neighbor> = candidates
            .into_iter()
            .map(|id| Neighbor::new(id, self.metric.distance(query, self.store.vector(id))))
            .collect();
        ranked.sort();
        ranked.truncate(k);
        Ok(ranked)
    }

    /// Like [`Searcher::nearest_by_vector`], using the stored vector of an
    /// existing item as the query. The item itself is not excluded from the
    /// results.
    pub fn nearest_by_item(
        &self,
        id: u32,
        k: usize,
        search_k: Option<usize>,
    ) -> Result<Vec<Neighbor>> {
        let query = self.store.get(id).ok_or(AnnError::OutOfRangeId {
            id,
            count: self.store.len(),
        })?;
        self.nearest_by_vector(query, k, search_k)
    }

    /// Best-first traversal of every tree at once, collecting leaf items
    /// until `budget` distinct candidates are found or the forest is
    /// exhausted.
    fn gather_candidates(&self, query: &[f32], budget: usize) -> Vec<u32> {
        let mut heap: BinaryHeap<TraversalEntry> = self
            .forest
            .trees()
            .iter()
            .enumerate()
            .map(|(i, tree)| TraversalEntry::new(f32::INFINITY, i as u32, tree.root()))
            .collect();

        let mut seen: HashSet<u32> = HashSet::new();
        let mut candidates: Vec<u32> = Vec::with_capacity(budget.min(self.store.len()));

        while candidates.len() < budget {
            let entry = match heap.pop() {
                Some(entry) => entry,
                None => break,
            };
            match self.forest.tree(entry.tree as usize).node(entry.node) {
                Node::Leaf { items } => {
                    for &id in items {
                        if seen.insert(id) {
                            candidates.push(id);
                        }
                    }
                }
                Node::Split { plane, left, right } => {
                    // The side the query falls on inherits the parent bound;
                    // the far side is capped by its distance to the plane, so
                    // it stays reachable instead of being pruned outright.
                    let margin = plane.margin(query);
                    heap.push(TraversalEntry::new(
                        entry.bound.min(margin),
                        entry.tree,
                        *right,
                    ));
                    heap.push(TraversalEntry::new(
                        entry.bound.min(-margin),
                        entry.tree,
                        *left,
                    ));
                }
            }
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::build_forest;
    use approx::assert_relative_eq;

    fn grid_store() -> PointStore {
        let mut store = PointStore::new(2);
        for y in 0..10 {
            for x in 0..10 {
                store.push(&[x as f32, y as f32]).unwrap();
            }
        }
        store
    }

    #[test]
    fn test_exact_match_is_first() {
        let store = grid_store();
        let forest = build_forest(&store, DistanceMetric::Euclidean, 10, 4, 11);
        let searcher = Searcher::new(&store, &forest, DistanceMetric::Euclidean);

        let results = searcher
            .nearest_by_vector(&[3.0, 4.0], 1, Some(100))
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 43);
        assert_relative_eq!(results[0].distance, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_results_are_sorted_and_unique() {
        let store = grid_store();
        let forest = build_forest(&store, DistanceMetric::Euclidean, 5, 4, 11);
        let searcher = Searcher::new(&store, &forest, DistanceMetric::Euclidean);

        let results = searcher
            .nearest_by_vector(&[4.5, 4.5], 20, Some(100))
            .unwrap();
        assert_eq!(results.len(), 20);
        for pair in results.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
        let mut ids: Vec<u32> = results.iter().map(|n| n.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn test_k_larger_than_item_count() {
        let mut store = PointStore::new(2);
        store.push(&[0.0, 0.0]).unwrap();
        store.push(&[1.0, 1.0]).unwrap();
        let forest = build_forest(&store, DistanceMetric::Euclidean, 3, 4, 1);
        let searcher = Searcher::new(&store, &forest, DistanceMetric::Euclidean);

        let results = searcher.nearest_by_vector(&[0.0, 0.0], 10, None).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_nearest_by_item_includes_self() {
        let store = grid_store();
        let forest = build_forest(&store, DistanceMetric::Euclidean, 10, 4, 11);
        let searcher = Searcher::new(&store, &forest, DistanceMetric::Euclidean);

        let results = searcher.nearest_by_item(55, 3, Some(100)).unwrap();
        assert_eq!(results[0].id, 55);
        assert_relative_eq!(results[0].distance, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_nearest_by_item_out_of_range() {
        let store = grid_store();
        let forest = build_forest(&store, DistanceMetric::Euclidean, 2, 4, 1);
        let searcher = Searcher::new(&store, &forest, DistanceMetric::Euclidean);

        assert!(matches!(
            searcher.nearest_by_item(1000, 1, None),
            Err(AnnError::OutOfRangeId { id: 1000, .. })
        ));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let store = grid_store();
        let forest = build_forest(&store, DistanceMetric::Euclidean, 2, 4, 1);
        let searcher = Searcher::new(&store, &forest, DistanceMetric::Euclidean);

        assert!(matches!(
            searcher.nearest_by_vector(&[1.0, 2.0, 3.0], 1, None),
            Err(AnnError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_exhaustive_search_k_matches_brute_force() {
        let store = grid_store();
        let forest = build_forest(&store, DistanceMetric::Euclidean, 4, 4, 7);
        let searcher = Searcher::new(&store, &forest, DistanceMetric::Euclidean);
        let query = [2.3, 7.9];

        // With search_k >= item count every leaf is visited, so the result
        // must equal exhaustive search.
        let approx = searcher.nearest_by_vector(&query, 5, Some(100)).unwrap();

        let mut exact: Vec<Neighbor> = (0..store.len() as u32)
            .map(|id| {
                Neighbor::new(
                    id,
                    DistanceMetric::Euclidean.distance(&query, store.vector(id)),
                )
            })
            .collect();
        exact.sort();
        exact.truncate(5);

        assert_eq!(approx, exact);
    }
}
