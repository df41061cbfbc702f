//! CSR object format: layout, edge filtering, decoding and writing.
//!
//! A graph is split into immutable objects, each covering a contiguous
//! range of node ids. Per object:
//!
//! ```text
//! [start_node u32][end_node u32]
//! [index section: one entry per node, 4 or 8 bytes]
//! [edge section: (label u32, destination u32) per edge]
//! ```
//!
//! Index entries are absolute byte offsets into the object, so a single
//! node's edges can be read with one range request.

pub mod directory;
pub mod edges;
pub mod layout;
pub mod object;
pub mod writer;

use serde::{Deserialize, Serialize};

pub use directory::ObjectDirectory;
pub use edges::{edges_from_bytes, filter_edges, with_label, Edge};
pub use layout::{EdgeSlice, IndexLayout, NodeOffsets, ObjectDescriptor, ObjectHeader, ObjectIndex};
pub use object::CsrObject;
pub use writer::{partition_graph, ObjectWriter};

/// Which side of a node's adjacency a request reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
    Both,
}

impl Direction {
    /// Parse direction from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in" | "incoming" => Some(Direction::Incoming),
            "out" | "outgoing" => Some(Direction::Outgoing),
            "both" => Some(Direction::Both),
            _ => None,
        }
    }
}
