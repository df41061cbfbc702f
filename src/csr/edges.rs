//! Edge records and label/direction filtering.

use crate::codec::decode_pairs;
use crate::csr::Direction;
use crate::error::Result;

/// One stored edge. For incoming ranges `destination` is the source node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub label: u32,
    pub destination: u32,
}

impl Edge {
    pub fn new(label: u32, destination: u32) -> Self {
        Self { label, destination }
    }
}

/// Parse an edge section (or a slice of one) into typed edges.
pub fn edges_from_bytes(bytes: &[u8]) -> Result<Vec<Edge>> {
    Ok(decode_pairs(bytes)?
        .into_iter()
        .map(|pair| Edge {
            label: pair.first,
            destination: pair.second,
        })
        .collect())
}

/// Destinations of all edges carrying `label` in a label-sorted slice.
///
/// Two binary searches bound the run of matching labels; an absent label
/// or an empty slice yields an empty result.
pub fn with_label(edges: &[Edge], label: u32) -> Vec<u32> {
    let start = edges.partition_point(|e| e.label < label);
    let end = edges.partition_point(|e| e.label <= label);
    edges[start..end].iter().map(|e| e.destination).collect()
}

/// Filter a node's full edge list.
///
/// `outgoing_len` is the number of leading outgoing edges; anything after it
/// is the incoming range. For `Both`, outgoing matches come first.
pub fn filter_edges(edges: &[Edge], outgoing_len: usize, label: u32, direction: Direction) -> Vec<u32> {
    let split = outgoing_len.min(edges.len());
    let (outgoing, incoming) = edges.split_at(split);
    match direction {
        Direction::Outgoing => with_label(outgoing, label),
        Direction::Incoming => with_label(incoming, label),
        Direction::Both => {
            let mut result = with_label(outgoing, label);
            result.extend(with_label(incoming, label));
            result
        }
    }
}
