//! GraphStore trait definition for graph database interaction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::data::{errors::GraphStoreError, types::JsonRecord};

/// One query plus its parameters, as issued against the graph store.
///
/// Parameters are a flat mapping from placeholder name to a scalar, list or map value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQuery {
    pub query: String,
    pub params: Option<JsonRecord>,
}

impl GraphQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: JsonRecord) -> Self {
        self.params = Some(params);
        self
    }

    /// Convenience for `json!({...})` literals; non-object values leave the query unparameterised.
    pub fn with_json(self, params: serde_json::Value) -> Self {
        match params {
            serde_json::Value::Object(map) => self.with_params(map),
            _ => self,
        }
    }

    /// Looks up one parameter by name.
    pub fn param(&self, key: &str) -> Option<&serde_json::Value> {
        self.params.as_ref().and_then(|params| params.get(key))
    }
}

/// Represents the interface for interacting with the graph database.
/// This abstracts the underlying database technology (e.g., Neo4j).
///
/// Queries are opaque strings supplied by configuration; the store only executes them.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Executes a single read or write query.
    ///
    /// Returns one record per result row, keyed by the names in the `RETURN` clause.
    async fn run_query(
        &self,
        query: &str,
        params: Option<JsonRecord>,
    ) -> Result<Vec<JsonRecord>, GraphStoreError>;

    /// Executes queries in order on the same connection and returns their results in order.
    /// Stops at the first failing query.
    async fn run_batch(
        &self,
        queries: &[GraphQuery],
    ) -> Result<Vec<Vec<JsonRecord>>, GraphStoreError> {
        let mut results = Vec::with_capacity(queries.len());
        for q in queries {
            results.push(self.run_query(&q.query, q.params.clone()).await?);
        }
        Ok(results)
    }
}

/// Opens a graph store handle for one unit of work. The handle is released when dropped.
#[async_trait]
pub trait GraphConnector: Send + Sync {
    async fn open(&self) -> Result<Box<dyn GraphStore>, GraphStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_json_keeps_object_params() {
        let q = GraphQuery::new("RETURN $x AS x").with_json(json!({"x": 1}));
        assert_eq!(q.param("x"), Some(&json!(1)));

        let q = GraphQuery::new("RETURN 1").with_json(json!(null));
        assert!(q.params.is_none());
    }
}
