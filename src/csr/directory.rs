//! Sorted set of object indexes covering the node id space.

use rayon::prelude::*;
use tracing::info;

use crate::csr::layout::{IndexLayout, ObjectIndex};
use crate::error::{GraphError, Result};
use crate::storage::ObjectStore;

/// All object indexes, sorted by start node, non-overlapping.
#[derive(Debug, Clone, Default)]
pub struct ObjectDirectory {
    objects: Vec<ObjectIndex>,
}

impl ObjectDirectory {
    /// Sort and check that no two objects claim the same node.
    pub fn new(mut objects: Vec<ObjectIndex>) -> Result<Self> {
        objects.sort_by_key(|o| o.descriptor().start_node);
        for pair in objects.windows(2) {
            let (a, b) = (pair[0].descriptor(), pair[1].descriptor());
            if a.end_node >= b.start_node {
                return Err(GraphError::InvalidFormat(format!(
                    "objects '{}' [{}, {}] and '{}' [{}, {}] overlap",
                    a.object_name, a.start_node, a.end_node, b.object_name, b.start_node, b.end_node
                )));
            }
        }
        Ok(Self { objects })
    }

    /// List the store and load every object's index in parallel.
    pub fn load(store: &dyn ObjectStore, layout: IndexLayout) -> Result<Self> {
        let names = store.list_objects()?;
        let objects = names
            .par_iter()
            .map(|name| ObjectIndex::load(store, name, layout))
            .collect::<Result<Vec<_>>>()?;
        let directory = Self::new(objects)?;
        info!(
            objects = directory.len(),
            layout = layout.as_str(),
            "loaded object directory"
        );
        Ok(directory)
    }

    /// Binary search for the object holding `node`.
    pub fn find(&self, node: u32) -> Result<&ObjectIndex> {
        let after = self.objects.partition_point(|o| o.descriptor().start_node <= node);
        match after.checked_sub(1).map(|i| &self.objects[i]) {
            Some(index) if index.contains(node) => Ok(index),
            _ => Err(GraphError::NodeNotFound(node)),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectIndex> {
        self.objects.iter()
    }
}
