//! Object writer.
//!
//! Produces objects in the exact layout the readers expect. The service
//! itself never writes; this exists for test fixtures, benchmarks and the
//! server's demo data.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::csr::edges::Edge;
use crate::csr::layout::{IndexLayout, ObjectHeader, EDGE_SIZE};
use crate::error::{GraphError, Result};
use crate::csr::Direction;

/// Accumulates the adjacency of one node range, then encodes it on
/// `finish()`.
pub struct ObjectWriter {
    header: ObjectHeader,
    layout: IndexLayout,
    outgoing: Vec<Vec<Edge>>,
    incoming: Vec<Vec<Edge>>,
}

impl ObjectWriter {
    /// Create a writer for nodes `[start_node, end_node]`.
    pub fn new(start_node: u32, end_node: u32, layout: IndexLayout) -> Result<Self> {
        if end_node < start_node {
            return Err(GraphError::InvalidConfig(format!(
                "end node {} before start node {}",
                end_node, start_node
            )));
        }
        let header = ObjectHeader { start_node, end_node };
        let n = header.node_count();
        Ok(Self {
            header,
            layout,
            outgoing: vec![Vec::new(); n],
            incoming: vec![Vec::new(); n],
        })
    }

    fn slot(&self, node: u32) -> Result<usize> {
        if node < self.header.start_node || node > self.header.end_node {
            return Err(GraphError::NodeNotFound(node));
        }
        Ok((node - self.header.start_node) as usize)
    }

    /// Record `node -label-> destination`.
    pub fn add_outgoing(&mut self, node: u32, label: u32, destination: u32) -> Result<()> {
        let slot = self.slot(node)?;
        self.outgoing[slot].push(Edge::new(label, destination));
        Ok(())
    }

    /// Record `source -label-> node` on the receiving side.
    pub fn add_incoming(&mut self, node: u32, label: u32, source: u32) -> Result<()> {
        if self.layout == IndexLayout::OutgoingOnly {
            return Err(GraphError::UnsupportedDirection(Direction::Incoming));
        }
        let slot = self.slot(node)?;
        self.incoming[slot].push(Edge::new(label, source));
        Ok(())
    }

    /// Encode the object. Each node's runs are sorted by label.
    ///
    /// ## Binary layout
    ///
    /// ```text
    /// [start_node u32][end_node u32]
    /// [outgoing u32 (, incoming u32)] × node_count
    /// [label u32, destination u32] × edges
    /// ```
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let edge_start = self.header.edge_section_start(self.layout) as usize;
        let edge_count: usize = self.outgoing.iter().chain(&self.incoming).map(Vec::len).sum();
        let total = edge_start + edge_count * EDGE_SIZE;
        if total > u32::MAX as usize {
            return Err(GraphError::InvalidFormat(format!(
                "object of {} bytes exceeds u32 offsets",
                total
            )));
        }

        let mut index = Vec::with_capacity(edge_start);
        let mut edges = Vec::with_capacity(edge_count * EDGE_SIZE);
        index.extend_from_slice(&self.header.to_bytes());

        for (out, inc) in self.outgoing.iter_mut().zip(self.incoming.iter_mut()) {
            out.sort_by_key(|e| e.label);
            inc.sort_by_key(|e| e.label);

            let outgoing_offset = (edge_start + edges.len()) as u32;
            push_edges(&mut edges, out);
            let incoming_offset = (edge_start + edges.len()) as u32;
            push_edges(&mut edges, inc);

            index.extend_from_slice(&outgoing_offset.to_le_bytes());
            if self.layout == IndexLayout::Bidirectional {
                index.extend_from_slice(&incoming_offset.to_le_bytes());
            }
        }

        debug_assert_eq!(index.len(), edge_start);
        index.extend_from_slice(&edges);
        Ok(index)
    }

    /// Encode and write to `path`.
    pub fn write_to(self, path: &Path) -> Result<()> {
        let bytes = self.finish()?;
        let mut file = File::create(path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        Ok(())
    }
}

fn push_edges(out: &mut Vec<u8>, edges: &[Edge]) {
    for edge in edges {
        out.extend_from_slice(&edge.label.to_le_bytes());
        out.extend_from_slice(&edge.destination.to_le_bytes());
    }
}

/// Split a directed edge list `(source, label, destination)` over nodes
/// `[0, node_count)` into objects of `nodes_per_object` nodes each.
///
/// Returns `(object_name, bytes)` in node order.
pub fn partition_graph(
    edges: &[(u32, u32, u32)],
    node_count: u32,
    nodes_per_object: u32,
    layout: IndexLayout,
) -> Result<Vec<(String, Vec<u8>)>> {
    if node_count == 0 || nodes_per_object == 0 {
        return Err(GraphError::InvalidConfig(
            "node_count and nodes_per_object must be positive".into(),
        ));
    }

    let mut writers = Vec::new();
    let mut start = 0u32;
    while start < node_count {
        let end = start.saturating_add(nodes_per_object - 1).min(node_count - 1);
        writers.push(ObjectWriter::new(start, end, layout)?);
        if end == u32::MAX {
            break;
        }
        start = end + 1;
    }

    let owner = |node: u32| -> Result<usize> {
        if node >= node_count {
            return Err(GraphError::NodeNotFound(node));
        }
        Ok((node / nodes_per_object) as usize)
    };

    for &(src, label, dst) in edges {
        let dst_owner = owner(dst)?;
        writers[owner(src)?].add_outgoing(src, label, dst)?;
        if layout == IndexLayout::Bidirectional {
            writers[dst_owner].add_incoming(dst, label, src)?;
        }
    }

    writers
        .into_iter()
        .enumerate()
        .map(|(i, w)| Ok((format!("part-{:05}.csr", i), w.finish()?)))
        .collect()
}
