//! Ordering helpers that make f32-keyed entries usable in a BinaryHeap.

use std::cmp::Ordering;

/// A scored search result: item id plus exact distance to the query.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub id: u32,
    pub distance: f32,
}

impl Neighbor {
    pub fn new(id: u32, distance: f32) -> Self {
        Self { id, distance }
    }
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance && self.id == other.id
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Ascending by distance, ties broken by id so result order is deterministic.
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// A pending tree node in the best-first traversal, ordered by its
/// optimistic bound so that `BinaryHeap` pops the most promising node first.
#[derive(Debug, Clone, Copy)]
pub struct TraversalEntry {
    pub bound: f32,
    pub tree: u32,
    pub node: u32,
}

impl TraversalEntry {
    pub fn new(bound: f32, tree: u32, node: u32) -> Self {
        Self { bound, tree, node }
    }
}

impl PartialEq for TraversalEntry {
    fn eq(&self, other: &Self) -> bool {
        self.bound == other.bound && self.tree == other.tree && self.node == other.node
    }
}

impl Eq for TraversalEntry {}

impl PartialOrd for TraversalEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Max-heap on the bound; the (tree, node) tie-break keeps pop order
// deterministic when bounds collide.
impl Ord for TraversalEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bound
            .partial_cmp(&other.bound)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.tree.cmp(&self.tree))
            .then_with(|| other.node.cmp(&self.node))
    }
}
