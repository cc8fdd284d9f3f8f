use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::data::{errors::GraphStoreError, types::JsonRecord};
use crate::traits::graph_store::{GraphConnector, GraphQuery, GraphStore};

/// Computes the rows of a query from its parameters.
pub type QueryHandler =
    Arc<dyn Fn(Option<&JsonRecord>) -> Result<Vec<JsonRecord>, GraphStoreError> + Send + Sync>;

/// A `GraphStore` that records every query it receives.
///
/// Queries return no rows unless a handler is registered for a fragment of their text. When
/// several fragments match, the most recently registered handler wins. Clones share state.
#[derive(Clone, Default)]
pub struct FakeGraphStore {
    executed: Arc<Mutex<Vec<GraphQuery>>>,
    handlers: Arc<Mutex<Vec<(String, QueryHandler)>>>,
}

impl FakeGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers queries containing `fragment` with `handler`.
    pub fn on_query<F>(&self, fragment: impl Into<String>, handler: F)
    where
        F: Fn(Option<&JsonRecord>) -> Result<Vec<JsonRecord>, GraphStoreError> + Send + Sync + 'static,
    {
        self.handlers.lock().push((fragment.into(), Arc::new(handler)));
    }

    /// Answers queries containing `fragment` with fixed rows.
    pub fn respond_with(&self, fragment: impl Into<String>, rows: Vec<JsonRecord>) {
        self.on_query(fragment, move |_| Ok(rows.clone()));
    }

    /// Fails queries containing `fragment`.
    pub fn fail_on(&self, fragment: impl Into<String>, message: impl Into<String>) {
        let message = message.into();
        self.on_query(fragment, move |_| Err(GraphStoreError::QueryError(message.clone())));
    }

    /// Every query received so far, in order, including failed ones.
    pub fn executed(&self) -> Vec<GraphQuery> {
        self.executed.lock().clone()
    }

    /// Received queries whose text contains `fragment`.
    pub fn executed_matching(&self, fragment: &str) -> Vec<GraphQuery> {
        self.executed
            .lock()
            .iter()
            .filter(|q| q.query.contains(fragment))
            .cloned()
            .collect()
    }

    pub fn clear_log(&self) {
        self.executed.lock().clear();
    }

    fn handler_for(&self, query: &str) -> Option<QueryHandler> {
        self.handlers
            .lock()
            .iter()
            .rev()
            .find(|(fragment, _)| query.contains(fragment.as_str()))
            .map(|(_, handler)| Arc::clone(handler))
    }
}

impl fmt::Debug for FakeGraphStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeGraphStore")
            .field("executed", &self.executed.lock().len())
            .field("handlers", &self.handlers.lock().len())
            .finish()
    }
}

#[async_trait]
impl GraphStore for FakeGraphStore {
    async fn run_query(
        &self,
        query: &str,
        params: Option<JsonRecord>,
    ) -> Result<Vec<JsonRecord>, GraphStoreError> {
        self.executed.lock().push(GraphQuery {
            query: query.to_string(),
            params: params.clone(),
        });
        // The handler runs without holding any lock, so it may inspect the store.
        match self.handler_for(query) {
            Some(handler) => handler(params.as_ref()),
            None => Ok(Vec::new()),
        }
    }
}

/// Hands out handles to one shared [`FakeGraphStore`] and counts them.
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    store: FakeGraphStore,
    opened: Arc<AtomicUsize>,
    unavailable: bool,
}

impl FakeConnector {
    pub fn new(store: FakeGraphStore) -> Self {
        Self {
            store,
            ..Default::default()
        }
    }

    /// A connector whose store can never be reached.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn store(&self) -> &FakeGraphStore {
        &self.store
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphConnector for FakeConnector {
    async fn open(&self) -> Result<Box<dyn GraphStore>, GraphStoreError> {
        if self.unavailable {
            return Err(GraphStoreError::ConnectionError("fake store is unavailable".into()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.store.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_latest_matching_handler_wins() {
        let store = FakeGraphStore::new();
        store.respond_with("RETURN", vec![json!({"x": 1}).as_object().cloned().unwrap()]);
        store.fail_on("RETURN 2", "boom");

        assert_eq!(store.run_query("RETURN 1 AS x", None).await.unwrap().len(), 1);
        assert!(store.run_query("RETURN 2 AS x", None).await.is_err());
        assert!(store.run_query("MATCH (n) DELETE n", None).await.unwrap().is_empty());
        assert_eq!(store.executed().len(), 3);
    }

    #[tokio::test]
    async fn test_batch_stops_at_first_failure() {
        let store = FakeGraphStore::new();
        store.fail_on("second", "boom");

        let result = store
            .run_batch(&[
                GraphQuery::new("first"),
                GraphQuery::new("second"),
                GraphQuery::new("third"),
            ])
            .await;

        assert!(result.is_err());
        assert!(store.executed_matching("third").is_empty());
    }
}
