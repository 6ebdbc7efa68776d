//! File I/O for index images: durable writes, memory-mapped reads.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::forest::Forest;
use crate::persistence::format::{self, Header};
use crate::store::PointStore;

/// Write an image to disk and fsync it.
pub fn write_image(path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Read and decode an image, preferring a read-only memory map.
///
/// Falls back to a regular read if mapping fails; either way the decoded
/// structures own their data, so the mapping does not outlive this call.
pub fn read_image(
    path: impl AsRef<Path>,
    expected_dimension: usize,
    expected_metric: DistanceMetric,
) -> Result<(PointStore, Forest, Header)> {
    let file = File::open(&path)?;
    match unsafe { memmap2::Mmap::map(&file) } {
        Ok(mmap) => format::decode_index(&mmap, expected_dimension, expected_metric),
        Err(_) => {
            let bytes = std::fs::read(&path)?;
            format::decode_index(&bytes, expected_dimension, expected_metric)
        }
    }
}

/// Read just the header of an on-disk image (for inspection tooling).
pub fn peek_header(path: impl AsRef<Path>) -> Result<Header> {
    let file = File::open(&path)?;
    match unsafe { memmap2::Mmap::map(&file) } {
        Ok(mmap) => format::decode_header(&mmap),
        Err(_) => {
            let bytes = std::fs::read(&path)?;
            format::decode_header(&bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnnError;
    use crate::forest::build_forest;
    use tempfile::TempDir;

    fn built_parts() -> (PointStore, Forest) {
        let mut store = PointStore::new(2);
        for i in 0..40u32 {
            store.push(&[i as f32, (i % 6) as f32]).unwrap();
        }
        let forest = build_forest(&store, DistanceMetric::Euclidean, 3, 8, 5);
        (store, forest)
    }

    #[test]
    fn test_write_and_read_image() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.ann");

        let (store, forest) = built_parts();
        let bytes = format::encode_index(&store, &forest, DistanceMetric::Euclidean, 5);
        write_image(&path, &bytes).unwrap();

        let (store2, forest2, header) =
            read_image(&path, 2, DistanceMetric::Euclidean).unwrap();
        assert_eq!(store, store2);
        assert_eq!(forest, forest2);
        assert_eq!(header.seed, 5);
    }

    #[test]
    fn test_peek_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.ann");

        let (store, forest) = built_parts();
        let bytes = format::encode_index(&store, &forest, DistanceMetric::Euclidean, 5);
        write_image(&path, &bytes).unwrap();

        let header = peek_header(&path).unwrap();
        assert_eq!(header.dimension, 2);
        assert_eq!(header.item_count, 40);
        assert_eq!(header.tree_count, 3);
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("does-not-exist.ann");
        assert!(matches!(
            read_image(&path, 2, DistanceMetric::Euclidean),
            Err(AnnError::IoError(_))
        ));
    }

    #[test]
    fn test_write_to_unwritable_path_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("index.ann");
        assert!(matches!(
            write_image(&path, &[0u8; 4]),
            Err(AnnError::IoError(_))
        ));
    }
}
