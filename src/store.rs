//! Flat, append-only storage of item vectors.

use crate::error::{AnnError, Result};

/// Row-major storage of fixed-dimensional vectors, indexed by dense `u32` id.
///
/// Both the tree builder and the searcher read from this structure; after a
/// build it is never mutated again.
#[derive(Debug, Clone, PartialEq)]
pub struct PointStore {
    dimension: usize,
    data: Vec<f32>,
}

impl PointStore {
    /// Create an empty store for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Rebuild a store from a flat row-major buffer (used on load).
    pub(crate) fn from_raw(dimension: usize, data: Vec<f32>) -> Self {
        debug_assert!(dimension > 0 && data.len() % dimension == 0);
        Self { dimension, data }
    }

    /// The dimension every stored vector must have.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    /// Whether the store holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a vector, returning its id.
    pub fn push(&mut self, vector: &[f32]) -> Result<u32> {
        if vector.len() != self.dimension {
            return Err(AnnError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        let id = self.len() as u32;
        self.data.extend_from_slice(vector);
        Ok(id)
    }

    /// Vector for the given id, or `None` if out of range.
    pub fn get(&self, id: u32) -> Option<&[f32]> {
        let start = id as usize * self.dimension;
        self.data.get(start..start + self.dimension)
    }

    /// Vector for an id known to be in range.
    pub(crate) fn vector(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dimension;
        &self.data[start..start + self.dimension]
    }

    /// The whole store as one flat slice, row-major.
    pub fn as_flat_slice(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_get() {
        let mut store = PointStore::new(3);
        let id0 = store.push(&[1.0, 2.0, 3.0]).unwrap();
        let id1 = store.push(&[4.0, 5.0, 6.0]).unwrap();

        assert_eq!(id0, 0);
        assert_eq!(id1, 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(store.get(1), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(store.get(2), None);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut store = PointStore::new(2);
        let result = store.push(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            result,
            Err(AnnError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_from_raw_roundtrip() {
        let mut store = PointStore::new(2);
        store.push(&[1.0, 2.0]).unwrap();
        store.push(&[3.0, 4.0]).unwrap();

        let rebuilt = PointStore::from_raw(2, store.as_flat_slice().to_vec());
        assert_eq!(rebuilt, store);
    }

    #[test]
    fn test_empty_store() {
        let store = PointStore::new(4);
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert_eq!(store.get(0), None);
    }
}
