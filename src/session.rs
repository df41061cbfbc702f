//! ClientSession - Per-connection state management
//!
//! Each client connection to the server has its own session that remembers
//! the queries it opened, so they can be ended when the client goes away
//! without an explicit `endQuery`.

use std::collections::BTreeSet;

use tracing::debug;

use crate::engine::{GraphAccessEngine, QueryId};
use crate::error::Result;
use crate::prefetch::Algorithm;

/// Unique identifier for a client connection
pub type ClientId = usize;

/// Session state for a client connection
///
/// Created when a client connects and closed when they disconnect.
pub struct ClientSession {
    /// Unique client ID for this connection
    pub id: ClientId,
    /// Protocol version announced by the client in `hello`
    pub protocol_version: u32,
    queries: BTreeSet<QueryId>,
}

impl ClientSession {
    pub fn new(id: ClientId) -> Self {
        Self {
            id,
            protocol_version: 1,
            queries: BTreeSet::new(),
        }
    }

    /// Open a query on `engine` and record it as owned by this session.
    pub fn start_query(&mut self, engine: &GraphAccessEngine, algorithm: Algorithm) -> Result<QueryId> {
        let id = engine.start_query(algorithm)?;
        self.queries.insert(id);
        Ok(id)
    }

    /// End a query. Queries opened by other sessions may be ended too; they
    /// are simply not tracked here.
    pub fn end_query(&mut self, engine: &GraphAccessEngine, id: QueryId) -> Result<()> {
        self.queries.remove(&id);
        engine.end_query(id)
    }

    pub fn owns(&self, id: QueryId) -> bool {
        self.queries.contains(&id)
    }

    pub fn open_queries(&self) -> impl Iterator<Item = QueryId> + '_ {
        self.queries.iter().copied()
    }

    /// End every query this session still holds. Returns how many were
    /// ended.
    ///
    /// Called when the client disconnects.
    pub fn close(&mut self, engine: &GraphAccessEngine) -> usize {
        let mut ended = 0;
        for id in std::mem::take(&mut self.queries) {
            // Already gone if another session ended it.
            if engine.end_query(id).is_ok() {
                ended += 1;
            }
        }
        debug!(client = self.id, ended, "session closed");
        ended
    }
}

#[cfg(test)]
mod session_tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::csr::{partition_graph, IndexLayout};
    use crate::storage::{MemoryStore, ObjectStore};
    use std::sync::Arc;

    fn make_test_engine() -> GraphAccessEngine {
        let store = MemoryStore::new();
        for (name, bytes) in partition_graph(&[(0, 1, 1)], 2, 2, IndexLayout::Bidirectional).unwrap() {
            store.insert(name, bytes);
        }
        let store: Arc<dyn ObjectStore> = Arc::new(store);
        GraphAccessEngine::open(store, EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_session_new() {
        let session = ClientSession::new(1);

        assert_eq!(session.id, 1);
        assert_eq!(session.protocol_version, 1);
        assert_eq!(session.open_queries().count(), 0);
    }

    #[test]
    fn test_session_tracks_queries() {
        let engine = make_test_engine();
        let mut session = ClientSession::new(1);

        let a = session.start_query(&engine, Algorithm::Bfs).unwrap();
        let b = session.start_query(&engine, Algorithm::Dfs).unwrap();
        assert!(session.owns(a));
        assert!(session.owns(b));

        session.end_query(&engine, a).unwrap();
        assert!(!session.owns(a));
        assert_eq!(session.open_queries().collect::<Vec<_>>(), vec![b]);
        assert_eq!(engine.active_queries(), 1);
    }

    #[test]
    fn test_session_close_ends_open_queries() {
        let engine = make_test_engine();
        let mut session = ClientSession::new(7);
        let mut other = ClientSession::new(8);

        let mine = session.start_query(&engine, Algorithm::Bfs).unwrap();
        session.start_query(&engine, Algorithm::Bfs).unwrap();
        let theirs = other.start_query(&engine, Algorithm::Dfs).unwrap();

        // Ended from elsewhere before the session closes.
        engine.end_query(mine).unwrap();

        assert_eq!(session.close(&engine), 1);
        assert_eq!(session.open_queries().count(), 0);
        assert_eq!(engine.active_queries(), 1);
        assert!(other.owns(theirs));
    }
}
