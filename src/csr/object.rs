//! Whole-object reader.
//!
//! Decodes an entire object into `(start_node, indices, edges)`. The query
//! path never does this (it reads single-node ranges); it is used to
//! inspect objects and to cross-check range reads in tests.

use crate::csr::edges::{edges_from_bytes, filter_edges, Edge};
use crate::csr::layout::{IndexLayout, ObjectHeader, ObjectIndex, EDGE_SIZE, HEADER_SIZE};
use crate::csr::Direction;
use crate::error::{GraphError, Result};
use crate::storage::{ByteRange, ObjectStore};

/// Fully decoded object.
#[derive(Debug, Clone)]
pub struct CsrObject {
    index: ObjectIndex,
    edge_start: u64,
    edges: Vec<Edge>,
}

impl CsrObject {
    /// Fetch and decode a whole object.
    pub fn load(store: &dyn ObjectStore, object: &str, layout: IndexLayout) -> Result<Self> {
        let bytes = store.fetch(object, ByteRange::to_end(0))?;
        Self::from_bytes(object, &bytes, layout)
    }

    pub fn from_bytes(object: &str, bytes: &[u8], layout: IndexLayout) -> Result<Self> {
        let header = ObjectHeader::from_bytes(bytes)?;
        let edge_start = header.edge_section_start(layout);
        let index_bytes = bytes
            .get(HEADER_SIZE..edge_start as usize)
            .ok_or_else(|| GraphError::invalid_size(format!("at least {}", edge_start), bytes.len()))?;
        let index = ObjectIndex::parse(object, header, index_bytes, layout)?;
        let edges = edges_from_bytes(&bytes[edge_start as usize..])?;
        Ok(Self { index, edge_start, edges })
    }

    pub fn start_node(&self) -> u32 {
        self.index.descriptor().start_node
    }

    pub fn end_node(&self) -> u32 {
        self.index.descriptor().end_node
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn index(&self) -> &ObjectIndex {
        &self.index
    }

    /// Map a byte range of the object onto the decoded edge array.
    fn edges_in(&self, range: Option<ByteRange>) -> Result<&[Edge]> {
        let (start, end) = match range {
            None => return Ok(&[]),
            Some(ByteRange::Inclusive { start, end }) => (start, end + 1),
            Some(ByteRange::From { start }) => (start, self.edge_start + (self.edges.len() * EDGE_SIZE) as u64),
        };
        let first = ((start - self.edge_start) as usize) / EDGE_SIZE;
        let last = ((end - self.edge_start) as usize) / EDGE_SIZE;
        self.edges.get(first..last).ok_or_else(|| {
            GraphError::InvalidFormat(format!(
                "{}: offsets [{}, {}) past the edge section",
                self.index.descriptor().object_name,
                start,
                end
            ))
        })
    }

    /// Every edge of `node`, outgoing first.
    pub fn all_edges(&self, node: u32) -> Result<&[Edge]> {
        self.edges_in(self.index.all_edges(node)?.range)
    }

    pub fn neighbours(&self, node: u32, label: u32, direction: Direction) -> Result<Vec<u32>> {
        let slice = self.index.slice_for(node, direction)?;
        let edges = self.edges_in(slice.range)?;
        Ok(filter_edges(edges, slice.outgoing_len, label, direction))
    }
}
