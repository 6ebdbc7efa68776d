//! Tree construction: recursive randomized partitioning into an arena.

use crate::distance::{DistanceMetric, Hyperplane};
use crate::rng::RandomSource;
use crate::store::PointStore;

/// Maximum number of item ids stored directly in a leaf.
pub const DEFAULT_LEAF_CAPACITY: usize = 16;

/// Resampling attempts before giving up on a hyperplane and forcing a
/// balanced split.
const MAX_SPLIT_ATTEMPTS: usize = 3;

/// A node in a built tree. Created during a build pass, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Internal node: items with a negative margin go left, positive right.
    Split {
        plane: Hyperplane,
        left: u32,
        right: u32,
    },
    /// Terminal node holding item ids directly.
    Leaf { items: Vec<u32> },
}

/// One binary tree over a snapshot of the point store.
///
/// Nodes live in an arena and reference children by index. The arena is
/// filled post-order, so children always precede their parent and the root
/// is the last node.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        debug_assert!(!nodes.is_empty());
        Self { nodes }
    }

    /// Arena index of the root node.
    pub fn root(&self) -> u32 {
        (self.nodes.len() - 1) as u32
    }

    /// Node by arena index.
    pub fn node(&self, index: u32) -> &Node {
        &self.nodes[index as usize]
    }

    /// Total number of nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All nodes in arena order (children before parents).
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

/// Builds a single tree over all items currently in the store.
pub struct TreeBuilder<'a> {
    store: &'a PointStore,
    metric: DistanceMetric,
    leaf_capacity: usize,
    rng: RandomSource,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        store: &'a PointStore,
        metric: DistanceMetric,
        leaf_capacity: usize,
        rng: RandomSource,
    ) -> Self {
        Self {
            store,
            metric,
            leaf_capacity: leaf_capacity.max(1),
            rng,
            nodes: Vec::new(),
        }
    }

    /// Consume the builder and produce a tree over every stored item.
    ///
    /// The store must be non-empty; the index enforces that before building.
    pub fn build(mut self) -> Tree {
        let items: Vec<u32> = (0..self.store.len() as u32).collect();
        let root = self.build_subtree(items);
        debug_assert_eq!(root as usize, self.nodes.len() - 1);
        Tree::from_nodes(self.nodes)
    }

    fn build_subtree(&mut self, items: Vec<u32>) -> u32 {
        if items.len() <= self.leaf_capacity {
            return self.push(Node::Leaf { items });
        }

        for _ in 0..MAX_SPLIT_ATTEMPTS {
            let (a, b) = self.sample_pair(&items);
            let plane = match self.metric.create_split(
                self.store.vector(a),
                self.store.vector(b),
                &mut self.rng,
            ) {
                Some(plane) => plane,
                None => continue, // degenerate sample, try again
            };

            let (left_items, right_items) = self.partition(&items, &plane);
            if left_items.is_empty() || right_items.is_empty() {
                continue;
            }

            let left = self.build_subtree(left_items);
            let right = self.build_subtree(right_items);
            return self.push(Node::Split { plane, left, right });
        }

        self.forced_split(items)
    }

    /// Balanced fallback for degenerate data (e.g. many duplicate points):
    /// cut the id list at its midpoint and record a zero hyperplane, whose
    /// margin is 0 for every query so both halves remain explorable.
    fn forced_split(&mut self, mut items: Vec<u32>) -> u32 {
        let right_items = items.split_off(items.len() / 2);
        let plane = Hyperplane {
            normal: vec![0.0; self.store.dimension()],
            offset: 0.0,
        };
        let left = self.build_subtree(items);
        let right = self.build_subtree(right_items);
        self.push(Node::Split { plane, left, right })
    }

    fn sample_pair(&mut self, items: &[u32]) -> (u32, u32) {
        let i = self.rng.next_in_range(items.len());
        let mut j = self.rng.next_in_range(items.len() - 1);
        if j >= i {
            j += 1;
        }
        (items[i], items[j])
    }

    fn partition(&mut self, items: &[u32], plane: &Hyperplane) -> (Vec<u32>, Vec<u32>) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        for &id in items {
            let margin = plane.margin(self.store.vector(id));
            let go_right = if margin > 0.0 {
                true
            } else if margin < 0.0 {
                false
            } else {
                // On the plane: a coin from the tree's own stream keeps the
                // assignment deterministic under a fixed seed.
                self.rng.next_bool()
            };
            if go_right {
                right.push(id);
            } else {
                left.push(id);
            }
        }
        (left, right)
    }

    fn push(&mut self, node: Node) -> u32 {
        let index = self.nodes.len() as u32;
        self.nodes.push(node);
        index
    }
}
