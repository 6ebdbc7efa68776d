//! Distance metrics and the metric-specific splitting hyperplanes.

use serde::{Deserialize, Serialize};

use crate::rng::RandomSource;

/// Distance metrics for measuring vector similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean (L2) distance
    Euclidean,
    /// Angular distance, invariant under scaling of either vector
    Angular,
    /// Manhattan (L1) distance
    Manhattan,
    /// Dot product (negated so smaller is more similar)
    Dot,
    /// Hamming distance over scalars thresholded at 0.5
    Hamming,
}

impl DistanceMetric {
    /// Stable numeric id used in the serialized header.
    pub fn id(self) -> u8 {
        match self {
            DistanceMetric::Euclidean => 0,
            DistanceMetric::Angular => 1,
            DistanceMetric::Manhattan => 2,
            DistanceMetric::Dot => 3,
            DistanceMetric::Hamming => 4,
        }
    }

    /// Inverse of [`DistanceMetric::id`].
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(DistanceMetric::Euclidean),
            1 => Some(DistanceMetric::Angular),
            2 => Some(DistanceMetric::Manhattan),
            3 => Some(DistanceMetric::Dot),
            4 => Some(DistanceMetric::Hamming),
            _ => None,
        }
    }

    /// Compute the distance between two vectors of equal length.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            DistanceMetric::Euclidean => euclidean_distance(a, b),
            DistanceMetric::Angular => angular_distance(a, b),
            DistanceMetric::Manhattan => manhattan_distance(a, b),
            DistanceMetric::Dot => -dot_product(a, b),
            DistanceMetric::Hamming => hamming_distance(a, b),
        }
    }

    /// Derive a splitting hyperplane from two sampled points.
    ///
    /// Returns `None` when the points are degenerate for this metric
    /// (coincident, or zero-norm where a direction is required); the
    /// tree builder resamples or falls back to a forced split.
    pub fn create_split(
        &self,
        a: &[f32],
        b: &[f32],
        rng: &mut RandomSource,
    ) -> Option<Hyperplane> {
        debug_assert_eq!(a.len(), b.len());
        match self {
            DistanceMetric::Euclidean | DistanceMetric::Manhattan => {
                // Perpendicular bisector of the segment a..b.
                let mut normal: Vec<f32> = a.iter().zip(b).map(|(x, y)| x - y).collect();
                normalize_in_place(&mut normal)?;
                let offset = -normal
                    .iter()
                    .zip(a.iter().zip(b))
                    .map(|(n, (x, y))| n * (x + y) * 0.5)
                    .sum::<f32>();
                Some(Hyperplane { normal, offset })
            }
            DistanceMetric::Angular | DistanceMetric::Dot => {
                // Difference of directions; the plane passes through the origin.
                let na = norm(a);
                let nb = norm(b);
                if na <= f32::EPSILON || nb <= f32::EPSILON {
                    return None;
                }
                let mut normal: Vec<f32> =
                    a.iter().zip(b).map(|(x, y)| x / na - y / nb).collect();
                normalize_in_place(&mut normal)?;
                Some(Hyperplane {
                    normal,
                    offset: 0.0,
                })
            }
            DistanceMetric::Hamming => {
                // Split on one randomly chosen coordinate.
                let dim = rng.next_in_range(a.len());
                let mut normal = vec![0.0; a.len()];
                normal[dim] = 1.0;
                Some(Hyperplane {
                    normal,
                    offset: -0.5,
                })
            }
        }
    }
}

/// A splitting hyperplane: `margin(v) = normal . v + offset`.
///
/// The forced-split fallback stores an all-zero normal, which yields a zero
/// margin for every query so both subtrees stay equally explorable.
#[derive(Debug, Clone, PartialEq)]
pub struct Hyperplane {
    pub normal: Vec<f32>,
    pub offset: f32,
}

impl Hyperplane {
    /// Signed distance of `v` from the plane (unscaled).
    pub fn margin(&self, v: &[f32]) -> f32 {
        debug_assert_eq!(self.normal.len(), v.len());
        dot_product(&self.normal, v) + self.offset
    }
}

/// Compute Euclidean (L2) distance between two vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Compute Manhattan (L1) distance between two vectors.
pub fn manhattan_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

/// Compute angular distance: `sqrt(2 - 2 cos(a, b))`, in `[0, 2]`.
///
/// Zero-norm inputs are treated as orthogonal to everything rather than
/// erroring, matching the builder's handling of degenerate data.
pub fn angular_distance(a: &[f32], b: &[f32]) -> f32 {
    let na = norm(a);
    let nb = norm(b);
    let cos = if na <= f32::EPSILON || nb <= f32::EPSILON {
        0.0
    } else {
        (dot_product(a, b) / (na * nb)).clamp(-1.0, 1.0)
    };
    (2.0 - 2.0 * cos).max(0.0).sqrt()
}

/// Compute Hamming distance, treating each scalar as a bit (`x > 0.5`).
pub fn hamming_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .filter(|(x, y)| (**x > 0.5) != (**y > 0.5))
        .count() as f32
}

/// Compute the dot product of two vectors.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn normalize_in_place(v: &mut [f32]) -> Option<()> {
    let n = norm(v);
    if n <= f32::EPSILON {
        return None;
    }
    for x in v.iter_mut() {
        *x /= n;
    }
    Some(())
}
