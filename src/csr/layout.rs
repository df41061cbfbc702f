//! Object header and index section.
//!
//! The index section is read once per object when the service starts and
//! kept in memory; it is what turns a node id into the byte range of that
//! node's edges.

use serde::{Deserialize, Serialize};

use crate::codec::{decode_pairs, decode_u32_array, read_u32_at, PAIR_SIZE, U32_SIZE};
use crate::csr::Direction;
use crate::error::{GraphError, Result};
use crate::storage::{ByteRange, ObjectStore};

// ── Constants ──────────────────────────────────────────────────────

/// Header size in bytes: start_node u32 + end_node u32.
pub const HEADER_SIZE: usize = 8;

/// Size of one encoded edge.
pub const EDGE_SIZE: usize = PAIR_SIZE;

// ── Index Layout ───────────────────────────────────────────────────

/// Width of the per-node index entries. Not recorded in the objects
/// themselves; the whole object set shares one layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexLayout {
    /// One u32 per node: start of its outgoing edges.
    OutgoingOnly,
    /// Two u32 per node: start of outgoing edges, start of incoming edges.
    #[default]
    Bidirectional,
}

impl IndexLayout {
    pub fn entry_size(self) -> usize {
        match self {
            IndexLayout::OutgoingOnly => U32_SIZE,
            IndexLayout::Bidirectional => PAIR_SIZE,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "outgoing" | "outgoing_only" | "outgoing-only" => Some(IndexLayout::OutgoingOnly),
            "bidirectional" | "both" => Some(IndexLayout::Bidirectional),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexLayout::OutgoingOnly => "outgoing_only",
            IndexLayout::Bidirectional => "bidirectional",
        }
    }

    pub fn supports(self, direction: Direction) -> bool {
        self == IndexLayout::Bidirectional || direction == Direction::Outgoing
    }
}

// ── Header ─────────────────────────────────────────────────────────

/// First 8 bytes of every object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    pub start_node: u32,
    /// Inclusive.
    pub end_node: u32,
}

impl ObjectHeader {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let start_node = read_u32_at(bytes, 0)?;
        let end_node = read_u32_at(bytes, U32_SIZE)?;
        if end_node < start_node {
            return Err(GraphError::InvalidFormat(format!(
                "end node {} before start node {}",
                end_node, start_node
            )));
        }
        Ok(Self { start_node, end_node })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..4].copy_from_slice(&self.start_node.to_le_bytes());
        out[4..].copy_from_slice(&self.end_node.to_le_bytes());
        out
    }

    pub fn node_count(&self) -> usize {
        (self.end_node - self.start_node) as usize + 1
    }

    pub fn index_size(&self, layout: IndexLayout) -> usize {
        self.node_count() * layout.entry_size()
    }

    /// Byte offset where the edge section begins.
    pub fn edge_section_start(&self, layout: IndexLayout) -> u64 {
        (HEADER_SIZE + self.index_size(layout)) as u64
    }
}

// ── Descriptors & Offsets ──────────────────────────────────────────

/// Which object holds nodes `[start_node, end_node]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDescriptor {
    pub start_node: u32,
    pub end_node: u32,
    pub object_name: String,
}

impl ObjectDescriptor {
    pub fn contains(&self, node: u32) -> bool {
        self.start_node <= node && node <= self.end_node
    }
}

/// Byte offsets of one node's edge runs in the bidirectional layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeOffsets {
    pub outgoing: u32,
    pub incoming: u32,
}

#[derive(Debug, Clone)]
enum OffsetTable {
    OutgoingOnly(Vec<u32>),
    Bidirectional(Vec<NodeOffsets>),
}

/// Byte range to read for a request, plus how many of the edges in that
/// range are outgoing. `range` is `None` when the node has no edges there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeSlice {
    pub range: Option<ByteRange>,
    /// `usize::MAX` for outgoing-only objects, where every edge is outgoing.
    pub outgoing_len: usize,
}

// ── ObjectIndex ────────────────────────────────────────────────────

/// Decoded index section of one object.
#[derive(Debug, Clone)]
pub struct ObjectIndex {
    descriptor: ObjectDescriptor,
    layout: IndexLayout,
    offsets: OffsetTable,
}

impl ObjectIndex {
    /// Read header and index section of `object` (two range fetches).
    pub fn load(store: &dyn ObjectStore, object: &str, layout: IndexLayout) -> Result<Self> {
        let header_bytes = store.fetch(object, ByteRange::inclusive(0, HEADER_SIZE as u64 - 1))?;
        let header = ObjectHeader::from_bytes(&header_bytes)?;
        let index_end = header.edge_section_start(layout);
        let index_bytes = store.fetch(object, ByteRange::inclusive(HEADER_SIZE as u64, index_end - 1))?;
        Self::parse(object, header, &index_bytes, layout)
    }

    /// Build from an already fetched index section.
    pub fn parse(object: &str, header: ObjectHeader, index_bytes: &[u8], layout: IndexLayout) -> Result<Self> {
        let expected = header.index_size(layout);
        if index_bytes.len() != expected {
            return Err(GraphError::invalid_size(format!("exactly {}", expected), index_bytes.len()));
        }

        let offsets = match layout {
            IndexLayout::OutgoingOnly => OffsetTable::OutgoingOnly(decode_u32_array(index_bytes)?),
            IndexLayout::Bidirectional => OffsetTable::Bidirectional(
                decode_pairs(index_bytes)?
                    .into_iter()
                    .map(|p| NodeOffsets {
                        outgoing: p.first,
                        incoming: p.second,
                    })
                    .collect(),
            ),
        };

        let index = Self {
            descriptor: ObjectDescriptor {
                start_node: header.start_node,
                end_node: header.end_node,
                object_name: object.to_string(),
            },
            layout,
            offsets,
        };
        index.validate(header.edge_section_start(layout))?;
        Ok(index)
    }

    /// Offsets must be edge-aligned, inside the edge section and
    /// non-decreasing in file order.
    fn validate(&self, edge_start: u64) -> Result<()> {
        let bounds: Vec<u32> = match &self.offsets {
            OffsetTable::OutgoingOnly(offsets) => offsets.clone(),
            OffsetTable::Bidirectional(offsets) => {
                offsets.iter().flat_map(|o| [o.outgoing, o.incoming]).collect()
            }
        };
        let mut previous = edge_start;
        for offset in bounds {
            let offset = offset as u64;
            if offset < previous {
                return Err(GraphError::InvalidFormat(format!(
                    "{}: offset {} decreases (previous {})",
                    self.descriptor.object_name, offset, previous
                )));
            }
            if (offset - edge_start) % EDGE_SIZE as u64 != 0 {
                return Err(GraphError::InvalidFormat(format!(
                    "{}: offset {} not aligned to an edge",
                    self.descriptor.object_name, offset
                )));
            }
            previous = offset;
        }
        Ok(())
    }

    pub fn descriptor(&self) -> &ObjectDescriptor {
        &self.descriptor
    }

    pub fn layout(&self) -> IndexLayout {
        self.layout
    }

    pub fn contains(&self, node: u32) -> bool {
        self.descriptor.contains(node)
    }

    fn position(&self, node: u32) -> Result<usize> {
        if !self.contains(node) {
            return Err(GraphError::NodeNotFound(node));
        }
        Ok((node - self.descriptor.start_node) as usize)
    }

    /// Range from `start` to `end`, or to the end of the object.
    fn bounded(start: u32, end: Option<u32>) -> Option<ByteRange> {
        match end {
            Some(end) => ByteRange::half_open(start as u64, end as u64),
            None => Some(ByteRange::to_end(start as u64)),
        }
    }

    /// Exactly the bytes needed to answer a request in `direction`.
    pub fn slice_for(&self, node: u32, direction: Direction) -> Result<EdgeSlice> {
        let idx = self.position(node)?;
        match &self.offsets {
            OffsetTable::OutgoingOnly(offsets) => {
                if direction != Direction::Outgoing {
                    return Err(GraphError::UnsupportedDirection(direction));
                }
                Ok(EdgeSlice {
                    range: Self::bounded(offsets[idx], offsets.get(idx + 1).copied()),
                    outgoing_len: usize::MAX,
                })
            }
            OffsetTable::Bidirectional(offsets) => {
                let here = offsets[idx];
                let next = offsets.get(idx + 1).map(|o| o.outgoing);
                let outgoing_len = ((here.incoming - here.outgoing) as usize) / EDGE_SIZE;
                Ok(match direction {
                    Direction::Outgoing => EdgeSlice {
                        range: ByteRange::half_open(here.outgoing as u64, here.incoming as u64),
                        outgoing_len,
                    },
                    Direction::Incoming => EdgeSlice {
                        range: Self::bounded(here.incoming, next),
                        outgoing_len: 0,
                    },
                    Direction::Both => EdgeSlice {
                        range: Self::bounded(here.outgoing, next),
                        outgoing_len,
                    },
                })
            }
        }
    }

    /// Every edge stored for `node`, outgoing first.
    pub fn all_edges(&self, node: u32) -> Result<EdgeSlice> {
        match self.layout {
            IndexLayout::OutgoingOnly => self.slice_for(node, Direction::Outgoing),
            IndexLayout::Bidirectional => self.slice_for(node, Direction::Both),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(start: u32, end: u32) -> ObjectHeader {
        ObjectHeader { start_node: start, end_node: end }
    }

    fn pairs_bytes(pairs: &[(u32, u32)]) -> Vec<u8> {
        pairs
            .iter()
            .flat_map(|&(a, b)| a.to_le_bytes().into_iter().chain(b.to_le_bytes()))
            .collect()
    }

    #[test]
    fn test_header_round_trip_and_sizes() {
        let h = header(10, 13);
        assert_eq!(ObjectHeader::from_bytes(&h.to_bytes()).unwrap(), h);
        assert_eq!(h.node_count(), 4);
        assert_eq!(h.edge_section_start(IndexLayout::Bidirectional), 8 + 32);
        assert_eq!(h.edge_section_start(IndexLayout::OutgoingOnly), 8 + 16);
        assert!(ObjectHeader::from_bytes(&[0; 7]).is_err());
        assert!(ObjectHeader::from_bytes(&header(5, 4).to_bytes()).is_err());
    }

    #[test]
    fn test_bidirectional_slices() {
        // Two nodes, edge section starts at 8 + 16 = 24.
        // node 0: out [24, 40) in [40, 48); node 1: out [48, 48) in [48, ..)
        let idx = ObjectIndex::parse(
            "obj",
            header(0, 1),
            &pairs_bytes(&[(24, 40), (48, 48)]),
            IndexLayout::Bidirectional,
        )
        .unwrap();

        let out = idx.slice_for(0, Direction::Outgoing).unwrap();
        assert_eq!(out.range, Some(ByteRange::inclusive(24, 39)));
        assert_eq!(out.outgoing_len, 2);

        let inc = idx.slice_for(0, Direction::Incoming).unwrap();
        assert_eq!(inc.range, Some(ByteRange::inclusive(40, 47)));
        assert_eq!(inc.outgoing_len, 0);

        assert_eq!(idx.slice_for(1, Direction::Outgoing).unwrap().range, None);
        assert_eq!(idx.slice_for(1, Direction::Incoming).unwrap().range, Some(ByteRange::to_end(48)));
        assert_eq!(idx.all_edges(0).unwrap().range, Some(ByteRange::inclusive(24, 47)));
        assert!(matches!(idx.slice_for(2, Direction::Both), Err(GraphError::NodeNotFound(2))));
    }

    #[test]
    fn test_outgoing_only_rejects_incoming() {
        let bytes: Vec<u8> = [16u32, 24].iter().flat_map(|v| v.to_le_bytes()).collect();
        let idx = ObjectIndex::parse("obj", header(0, 1), &bytes, IndexLayout::OutgoingOnly).unwrap();
        assert_eq!(idx.slice_for(0, Direction::Outgoing).unwrap().range, Some(ByteRange::inclusive(16, 23)));
        assert_eq!(idx.all_edges(1).unwrap().range, Some(ByteRange::to_end(24)));
        assert!(matches!(
            idx.slice_for(0, Direction::Both),
            Err(GraphError::UnsupportedDirection(Direction::Both))
        ));
    }

    #[test]
    fn test_corrupt_index_rejected() {
        // Wrong length.
        assert!(matches!(
            ObjectIndex::parse("obj", header(0, 1), &pairs_bytes(&[(24, 24)]), IndexLayout::Bidirectional),
            Err(GraphError::InvalidSize { .. })
        ));
        // Decreasing offsets.
        assert!(matches!(
            ObjectIndex::parse("obj", header(0, 1), &pairs_bytes(&[(32, 40), (24, 24)]), IndexLayout::Bidirectional),
            Err(GraphError::InvalidFormat(_))
        ));
        // Misaligned.
        assert!(matches!(
            ObjectIndex::parse("obj", header(0, 1), &pairs_bytes(&[(24, 28), (32, 32)]), IndexLayout::Bidirectional),
            Err(GraphError::InvalidFormat(_))
        ));
        // Points into the index section.
        assert!(matches!(
            ObjectIndex::parse("obj", header(0, 1), &pairs_bytes(&[(8, 24), (24, 24)]), IndexLayout::Bidirectional),
            Err(GraphError::InvalidFormat(_))
        ));
    }
}
