//! Binary layout of the serialized index image.
//!
//! A single contiguous buffer, little-endian throughout:
//!
//! ```text
//! [header: 32 bytes]
//! [vectors: item_count * dimension * 4 bytes, row-major f32]
//! [tree region 0] .. [tree region N-1]
//! [root table: N x u64 region offsets, relative to the start of the
//!  tree area]
//! ```
//!
//! Each tree region is `[node_count: u32]` followed by its nodes in arena
//! order (children before parents, root last). Child references are arena
//! indices, so the image needs no pointer fixup to be traversed.
//!
//! Header: `[magic "ANNF"][version u16][metric u8][reserved u8]
//! [dimension u32][item_count u32][tree_count u32][seed u64][crc32 u32]`
//! where the CRC covers everything after the header.

use crate::distance::{DistanceMetric, Hyperplane};
use crate::error::{AnnError, Result};
use crate::forest::Forest;
use crate::store::PointStore;
use crate::tree::{Node, Tree};

pub const MAGIC: [u8; 4] = *b"ANNF";
pub const FORMAT_VERSION: u16 = 1;
pub const HEADER_LEN: usize = 32;

const NODE_TAG_LEAF: u8 = 0;
const NODE_TAG_SPLIT: u8 = 1;

/// Decoded file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u16,
    pub metric: DistanceMetric,
    pub dimension: usize,
    pub item_count: usize,
    pub tree_count: usize,
    pub seed: u64,
    pub payload_crc: u32,
}

/// Encode a built index into one contiguous image.
pub fn encode_index(
    store: &PointStore,
    forest: &Forest,
    metric: DistanceMetric,
    seed: u64,
) -> Vec<u8> {
    let mut payload = Vec::new();

    for value in store.as_flat_slice() {
        payload.extend_from_slice(&value.to_le_bytes());
    }

    let tree_area_start = payload.len();
    let mut root_offsets = Vec::with_capacity(forest.tree_count());
    for tree in forest.trees() {
        root_offsets.push((payload.len() - tree_area_start) as u64);
        encode_tree(&mut payload, tree);
    }
    for offset in &root_offsets {
        payload.extend_from_slice(&offset.to_le_bytes());
    }

    let crc = crc32fast::hash(&payload);

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.push(metric.id());
    out.push(0); // reserved
    out.extend_from_slice(&(store.dimension() as u32).to_le_bytes());
    out.extend_from_slice(&(store.len() as u32).to_le_bytes());
    out.extend_from_slice(&(forest.tree_count() as u32).to_le_bytes());
    out.extend_from_slice(&seed.to_le_bytes());
    out.extend_from_slice(&crc.to_le_bytes());
    debug_assert_eq!(out.len(), HEADER_LEN);
    out.extend_from_slice(&payload);
    out
}

fn encode_tree(out: &mut Vec<u8>, tree: &Tree) {
    out.extend_from_slice(&(tree.node_count() as u32).to_le_bytes());
    for node in tree.nodes() {
        match node {
            Node::Leaf { items } => {
                out.push(NODE_TAG_LEAF);
                out.extend_from_slice(&(items.len() as u32).to_le_bytes());
                for id in items {
                    out.extend_from_slice(&id.to_le_bytes());
                }
            }
            Node::Split { plane, left, right } => {
                out.push(NODE_TAG_SPLIT);
                out.extend_from_slice(&left.to_le_bytes());
                out.extend_from_slice(&right.to_le_bytes());
                out.extend_from_slice(&plane.offset.to_le_bytes());
                for value in &plane.normal {
                    out.extend_from_slice(&value.to_le_bytes());
                }
            }
        }
    }
}

/// Decode just the header, without validating the payload.
pub fn decode_header(bytes: &[u8]) -> Result<Header> {
    if bytes.len() < HEADER_LEN {
        return Err(AnnError::FormatError(format!(
            "file too small for header: {} bytes",
            bytes.len()
        )));
    }
    if bytes[0..4] != MAGIC {
        return Err(AnnError::FormatError("bad magic".to_string()));
    }
    let version = u16::from_le_bytes(bytes[4..6].try_into().unwrap());
    if version != FORMAT_VERSION {
        return Err(AnnError::FormatError(format!(
            "unsupported format version {version}"
        )));
    }
    let metric = DistanceMetric::from_id(bytes[6])
        .ok_or_else(|| AnnError::FormatError(format!("unknown metric id {}", bytes[6])))?;
    let dimension = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
    if dimension == 0 {
        return Err(AnnError::FormatError("dimension is zero".to_string()));
    }
    let item_count = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;
    let tree_count = u32::from_le_bytes(bytes[16..20].try_into().unwrap()) as usize;
    let seed = u64::from_le_bytes(bytes[20..28].try_into().unwrap());
    let payload_crc = u32::from_le_bytes(bytes[28..32].try_into().unwrap());

    Ok(Header {
        version,
        metric,
        dimension,
        item_count,
        tree_count,
        seed,
        payload_crc,
    })
}

/// Decode and validate a full image into its store and forest.
///
/// `expected_dimension` and `expected_metric` come from the caller
/// constructing the index; any disagreement with the header is a
/// [`AnnError::FormatError`].
pub fn decode_index(
    bytes: &[u8],
    expected_dimension: usize,
    expected_metric: DistanceMetric,
) -> Result<(PointStore, Forest, Header)> {
    let header = decode_header(bytes)?;
    if header.dimension != expected_dimension {
        return Err(AnnError::FormatError(format!(
            "dimension mismatch: file has {}, caller expects {}",
            header.dimension, expected_dimension
        )));
    }
    if header.metric != expected_metric {
        return Err(AnnError::FormatError(format!(
            "metric mismatch: file has {:?}, caller expects {:?}",
            header.metric, expected_metric
        )));
    }

    let payload = &bytes[HEADER_LEN..];
    if crc32fast::hash(payload) != header.payload_crc {
        return Err(AnnError::FormatError("payload checksum mismatch".to_string()));
    }

    let vectors_len = header
        .item_count
        .checked_mul(header.dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| AnnError::FormatError("vector block overflows".to_string()))?;
    let table_len = header
        .tree_count
        .checked_mul(8)
        .ok_or_else(|| AnnError::FormatError("root table overflows".to_string()))?;
    let minimum_len = vectors_len
        .checked_add(table_len)
        .ok_or_else(|| AnnError::FormatError("declared sizes overflow".to_string()))?;
    if payload.len() < minimum_len {
        return Err(AnnError::FormatError(format!(
            "file truncated: payload {} bytes, need at least {minimum_len}",
            payload.len()
        )));
    }

    let mut data = Vec::with_capacity(vectors_len / 4);
    for chunk in payload[..vectors_len].chunks_exact(4) {
        data.push(f32::from_le_bytes(chunk.try_into().unwrap()));
    }
    let store = PointStore::from_raw(header.dimension, data);

    let tree_area = &payload[vectors_len..payload.len() - table_len];
    let table = &payload[payload.len() - table_len..];

    let mut cursor = Cursor::new(tree_area);
    let mut trees = Vec::with_capacity(header.tree_count);
    for i in 0..header.tree_count {
        let recorded = u64::from_le_bytes(table[i * 8..i * 8 + 8].try_into().unwrap());
        if recorded != cursor.position() as u64 {
            return Err(AnnError::FormatError(format!(
                "tree {i} root offset {recorded} does not match region position {}",
                cursor.position()
            )));
        }
        trees.push(decode_tree(&mut cursor, &header)?);
    }
    if !cursor.is_at_end() {
        return Err(AnnError::FormatError(
            "trailing bytes after last tree region".to_string(),
        ));
    }

    Ok((store, Forest::from_trees(trees), header))
}

fn decode_tree(cursor: &mut Cursor<'_>, header: &Header) -> Result<Tree> {
    let node_count = cursor.read_u32()? as usize;
    if node_count == 0 {
        return Err(AnnError::FormatError("empty tree region".to_string()));
    }

    // Capacities are capped by the bytes actually left in the region, so a
    // forged count cannot demand a huge allocation before the reads fail.
    let mut nodes = Vec::with_capacity(node_count.min(cursor.remaining()));
    for index in 0..node_count {
        match cursor.read_u8()? {
            NODE_TAG_LEAF => {
                let count = cursor.read_u32()? as usize;
                let mut items = Vec::with_capacity(count.min(cursor.remaining() / 4));
                for _ in 0..count {
                    let id = cursor.read_u32()?;
                    if id as usize >= header.item_count {
                        return Err(AnnError::FormatError(format!(
                            "leaf references item {id} beyond item count {}",
                            header.item_count
                        )));
                    }
                    items.push(id);
                }
                nodes.push(Node::Leaf { items });
            }
            NODE_TAG_SPLIT => {
                let left = cursor.read_u32()?;
                let right = cursor.read_u32()?;
                // Arena order guarantees children precede their parent.
                if left as usize >= index || right as usize >= index {
                    return Err(AnnError::FormatError(format!(
                        "split node {index} references forward child"
                    )));
                }
                let offset = cursor.read_f32()?;
                let mut normal = Vec::with_capacity(header.dimension.min(cursor.remaining() / 4));
                for _ in 0..header.dimension {
                    normal.push(cursor.read_f32()?);
                }
                nodes.push(Node::Split {
                    plane: Hyperplane { normal, offset },
                    left,
                    right,
                });
            }
            tag => {
                return Err(AnnError::FormatError(format!("unknown node tag {tag}")));
            }
        }
    }
    Ok(Tree::from_nodes(nodes))
}

/// Bounds-checked sequential reader over a byte slice.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn is_at_end(&self) -> bool {
        self.pos == self.bytes.len()
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let slice = self
            .bytes
            .get(self.pos..self.pos + n)
            .ok_or_else(|| AnnError::FormatError("file truncated mid-record".to_string()))?;
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }
}
