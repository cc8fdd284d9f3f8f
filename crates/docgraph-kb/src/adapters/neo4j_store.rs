use async_trait::async_trait;
use neo4rs::{BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder, Graph, Query};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::{
    config::Neo4jConfig,
    data::{errors::GraphStoreError, types::JsonRecord},
    traits::graph_store::{GraphConnector, GraphStore},
};

/// Neo4j implementation of the `GraphStore` trait
pub struct Neo4jGraphStore {
    graph: Arc<Graph>,
}

impl Neo4jGraphStore {
    /// Connects with retries and verifies the connection with a trivial query.
    pub async fn connect(config: &Neo4jConfig) -> Result<Self, GraphStoreError> {
        let mut config_builder = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.username)
            .password(&config.password)
            .max_connections(config.pool_size);

        if let Some(db) = &config.database {
            config_builder = config_builder.db(db.as_str());
        }

        let neo4j_config = config_builder.build().map_err(|e| {
            GraphStoreError::ConnectionError(format!("Failed to build Neo4j config: {}", e))
        })?;

        let attempts = config.connection_retry_count.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            match Graph::connect(neo4j_config.clone()).await {
                Ok(graph) => match graph.execute(Query::new("RETURN 1 AS ok".to_string())).await {
                    Ok(_) => {
                        info!(uri = %config.uri, attempt, "Connected to Neo4j");
                        return Ok(Self { graph: Arc::new(graph) });
                    }
                    Err(e) => {
                        error!("Connection test failed: {}", e);
                        last_error = Some(e.to_string());
                    }
                },
                Err(e) => {
                    error!("Failed to connect to Neo4j (attempt {}): {}", attempt, e);
                    last_error = Some(e.to_string());
                }
            }
            if attempt < attempts {
                tokio::time::sleep(config.connection_retry_delay).await;
            }
        }

        Err(GraphStoreError::ConnectionError(format!(
            "Failed to connect to Neo4j at {} after {} attempts. Last error: {}",
            config.uri,
            attempts,
            last_error.unwrap_or_default()
        )))
    }
}

/// Converts a JSON parameter value into its Bolt counterpart.
pub(crate) fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::from(i),
            None => BoltType::from(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => BoltType::from(s.as_str()),
        Value::Array(items) => {
            let mut list = BoltList::new();
            for item in items {
                list.push(json_to_bolt(item));
            }
            BoltType::List(list)
        }
        Value::Object(entries) => {
            let mut map = BoltMap::new();
            for (key, item) in entries {
                map.put(BoltString::from(key.as_str()), json_to_bolt(item));
            }
            BoltType::Map(map)
        }
    }
}

fn build_query(query: &str, params: Option<JsonRecord>) -> Query {
    let mut q = Query::new(query.to_string());
    for (key, value) in params.unwrap_or_default() {
        q = q.param(&key, json_to_bolt(&value));
    }
    q
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    #[instrument(skip(self, query, params), fields(n_params = params.as_ref().map_or(0, |p| p.len())))]
    async fn run_query(
        &self,
        query: &str,
        params: Option<JsonRecord>,
    ) -> Result<Vec<JsonRecord>, GraphStoreError> {
        debug!("Executing query: {}", query);

        let mut result = self
            .graph
            .execute(build_query(query, params))
            .await
            .map_err(|e| GraphStoreError::QueryError(format!("Failed to execute query: {}", e)))?;

        let mut rows = Vec::new();
        loop {
            match result.next().await {
                Ok(Some(row)) => {
                    let record = row.to::<JsonRecord>().map_err(|e| {
                        GraphStoreError::MappingError(format!("Failed to map row: {}", e))
                    })?;
                    rows.push(record);
                }
                Ok(None) => break,
                Err(e) => {
                    return Err(GraphStoreError::QueryError(format!(
                        "Failed to read query result: {}",
                        e
                    )))
                }
            }
        }

        debug!(rows = rows.len(), "Query finished");
        Ok(rows)
    }
}

/// Opens a fresh Neo4j connection per unit of work.
#[derive(Debug, Clone)]
pub struct Neo4jConnector {
    config: Neo4jConfig,
}

impl Neo4jConnector {
    pub fn new(config: Neo4jConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration used for this connector
    pub fn get_config(&self) -> &Neo4jConfig {
        &self.config
    }
}

#[async_trait]
impl GraphConnector for Neo4jConnector {
    async fn open(&self) -> Result<Box<dyn GraphStore>, GraphStoreError> {
        Ok(Box::new(Neo4jGraphStore::connect(&self.config).await?))
    }
}
