//! Integration test: engine over a directory of object files.
//!
//! Writes a partitioned graph to disk, serves it through `LocalStore`, and
//! checks range reads against a whole-object decode.

use std::sync::Arc;

use graph_access::csr::{partition_graph, CsrObject};
use graph_access::{
    Algorithm, Direction, EngineConfig, GraphAccessEngine, GraphError, IndexLayout, LocalStore, NeighbourRequest,
    ObjectStore,
};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sample_edges() -> Vec<(u32, u32, u32)> {
    let mut edges = Vec::new();
    for node in 0..50u32 {
        edges.push((node, node % 4, (node + 1) % 50));
        edges.push((node, (node + 1) % 4, (node * 3) % 50));
        if node % 5 == 0 {
            edges.push((node, 2, (node + 25) % 50));
        }
    }
    edges
}

fn write_graph(layout: IndexLayout) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, bytes) in partition_graph(&sample_edges(), 50, 8, layout).unwrap() {
        std::fs::write(dir.path().join(name), bytes).unwrap();
    }
    dir
}

fn open(dir: &TempDir, layout: IndexLayout) -> (Arc<LocalStore>, GraphAccessEngine) {
    let store = Arc::new(LocalStore::open(dir.path()).unwrap());
    let config = EngineConfig {
        index_layout: layout,
        ..Default::default()
    };
    let engine = GraphAccessEngine::open(Arc::clone(&store) as Arc<dyn ObjectStore>, config).unwrap();
    (store, engine)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn cold_request_fetches_once_then_hits_cache() {
    let dir = write_graph(IndexLayout::Bidirectional);
    let (_store, engine) = open(&dir, IndexLayout::Bidirectional);
    assert_eq!(engine.directory().len(), 7);

    let q = engine.start_query(Algorithm::Bfs).unwrap();
    let request = NeighbourRequest::new(10, 2, Direction::Outgoing);

    let first = engine.get_neighbours(request, q).unwrap();
    assert_eq!(first, vec![11, 35]);
    assert_eq!(engine.stats().remote_fetches, 1);

    let second = engine.get_neighbours(request, q).unwrap();
    assert_eq!(second, first);
    let stats = engine.stats();
    assert_eq!(stats.remote_fetches, 1);
    assert_eq!(stats.cache_hits, 1);

    engine.end_query(q).unwrap();
}

#[test]
fn range_reads_agree_with_whole_object_decode() {
    for layout in [IndexLayout::Bidirectional, IndexLayout::OutgoingOnly] {
        let dir = write_graph(layout);
        let (store, engine) = open(&dir, layout);
        let q = engine.start_query(Algorithm::Dfs).unwrap();

        let directions: &[Direction] = match layout {
            IndexLayout::Bidirectional => &[Direction::Outgoing, Direction::Incoming, Direction::Both],
            IndexLayout::OutgoingOnly => &[Direction::Outgoing],
        };

        for name in store.list_objects().unwrap() {
            let object = CsrObject::load(store.as_ref(), &name, layout).unwrap();
            for node in object.start_node()..=object.end_node() {
                for &direction in directions {
                    for label in 0..4 {
                        let expected = object.neighbours(node, label, direction).unwrap();
                        let got = engine
                            .get_neighbours(NeighbourRequest::new(node, label, direction), q)
                            .unwrap();
                        assert_eq!(got, expected, "node {} label {} {:?} ({:?})", node, label, direction, layout);
                    }
                }
            }
        }
        engine.end_query(q).unwrap();
    }
}

#[test]
fn request_errors_are_distinct_from_empty_results() {
    let dir = write_graph(IndexLayout::OutgoingOnly);
    let (_store, engine) = open(&dir, IndexLayout::OutgoingOnly);
    let q = engine.start_query(Algorithm::Bfs).unwrap();

    // Absent label: empty, not an error.
    assert!(engine
        .get_neighbours(NeighbourRequest::new(3, 9, Direction::Outgoing), q)
        .unwrap()
        .is_empty());

    let err = engine
        .get_neighbours(NeighbourRequest::new(3, 0, Direction::Incoming), q)
        .unwrap_err();
    assert_eq!(err.code(), "UNSUPPORTED_DIRECTION");

    let err = engine
        .get_neighbours(NeighbourRequest::new(50, 0, Direction::Outgoing), q)
        .unwrap_err();
    assert!(matches!(err, GraphError::NodeNotFound(50)));
}

#[test]
fn overlapping_objects_rejected_at_open() {
    let dir = write_graph(IndexLayout::Bidirectional);
    // A second object claiming nodes 0..=7 again.
    let (_, bytes) = partition_graph(&[(0, 1, 1)], 8, 8, IndexLayout::Bidirectional)
        .unwrap()
        .remove(0);
    std::fs::write(dir.path().join("zz-duplicate.csr"), bytes).unwrap();

    let store: Arc<dyn ObjectStore> = Arc::new(LocalStore::open(dir.path()).unwrap());
    let result = GraphAccessEngine::open(store, EngineConfig::default());
    assert!(matches!(result, Err(GraphError::InvalidFormat(_))));
}

#[test]
fn truncated_object_rejected_at_open() {
    let dir = write_graph(IndexLayout::Bidirectional);
    std::fs::write(dir.path().join("part-00000.csr"), [0u8, 0, 0, 0, 7, 0, 0, 0, 1, 2]).unwrap();

    let store: Arc<dyn ObjectStore> = Arc::new(LocalStore::open(dir.path()).unwrap());
    assert!(GraphAccessEngine::open(store, EngineConfig::default()).is_err());
}
