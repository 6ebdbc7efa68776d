//! Deterministic random source for tree construction.
//!
//! Every piece of randomness used while building the forest flows through
//! [`RandomSource`], which is seeded independently of any process-wide RNG.
//! Two builds with the same data, tree count, and seed are bit-for-bit
//! identical.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed used when the caller never sets one explicitly.
pub const DEFAULT_SEED: u64 = 0x5EED_F00D;

/// A seedable deterministic pseudo-random generator.
#[derive(Debug)]
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    /// Create a generator with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Derive an independent stream for one tree of the forest.
    ///
    /// Each tree gets its own generator keyed by (seed, tree index), so
    /// parallel construction order cannot influence the output.
    pub fn for_tree(seed: u64, tree_index: usize) -> Self {
        // splitmix64-style mix to decorrelate consecutive tree indices
        let mut z = seed ^ (tree_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        Self::new(z ^ (z >> 31))
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.rng.gen()
    }

    /// Uniform index in `0..n`. `n` must be non-zero.
    pub fn next_in_range(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    /// Fair coin, used for zero-margin tie breaks.
    pub fn next_bool(&mut self) -> bool {
        self.rng.gen()
    }

    /// A random vector of unit length with `dim` components.
    pub fn next_unit_vector(&mut self, dim: usize) -> Vec<f32> {
        loop {
            let v: Vec<f32> = (0..dim).map(|_| self.rng.gen_range(-1.0..1.0)).collect();
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > f32::EPSILON {
                return v.into_iter().map(|x| x / norm).collect();
            }
        }
    }
}
