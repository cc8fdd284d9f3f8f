//! Rebuilds the canonical knowledge layer from the raw extraction graph.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{error, info, instrument};

use crate::{
    data::{
        errors::{CoreError, GraphStoreError},
        types::JsonRecord,
    },
    traits::graph_store::GraphStore,
};

/// Drops every canonical node together with its relationships.
pub const QUERY_DELETE_KG: &str = "MATCH (n)
WHERE n:KGEntity OR n:ExplainRelation
DETACH DELETE n";

/// One mapping from a raw `(label)-[type]->(label)` pattern to its canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRow {
    pub source_label: String,
    pub relation_type: String,
    pub target_label: String,
    pub kg_source_label: String,
    pub kg_relation: String,
    pub kg_target_label: String,
}

/// Ordered schema rows read from `schema.txt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaTable {
    rows: Vec<SchemaRow>,
}

impl SchemaTable {
    pub fn new(rows: Vec<SchemaRow>) -> Self {
        Self { rows }
    }

    /// Parses a CSV file with a header row. A missing file or a table without rows is a
    /// configuration error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if !path.is_file() {
            error!("Missing KG schema definition! Please add file: {}", path.display());
            return Err(CoreError::config_error_with_context(
                "schema file not found",
                path,
                None::<std::io::Error>,
            ));
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| CoreError::config_error_with_context("cannot open schema file", path, Some(e)))?;

        let mut rows = Vec::new();
        for (line, record) in reader.deserialize::<SchemaRow>().enumerate() {
            let row = record.map_err(|e| {
                error!("Invalid schema row {}: {}", line + 1, e);
                CoreError::config_error_with_context("invalid schema row", path, Some(e))
            })?;
            rows.push(row);
        }

        if rows.is_empty() {
            error!("KG schema {} has no rows", path.display());
            return Err(CoreError::config_error_with_context(
                "schema table is empty",
                path,
                None::<std::io::Error>,
            ));
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[SchemaRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The `$schema` parameter of the build query: one map per row, in file order.
    pub fn to_param(&self) -> Value {
        Value::Array(
            self.rows
                .iter()
                .map(|row| serde_json::to_value(row).unwrap_or(Value::Null))
                .collect(),
        )
    }
}

/// Knowledge Layer Builder
pub struct KnowledgeLayerBuilder {
    create_query: String,
    schema: SchemaTable,
}

impl KnowledgeLayerBuilder {
    pub fn new(create_query: impl Into<String>, schema: SchemaTable) -> Self {
        Self {
            create_query: create_query.into(),
            schema,
        }
    }

    pub fn schema(&self) -> &SchemaTable {
        &self.schema
    }

    /// Deletes the whole canonical layer, rebuilds it and returns the number of canonical
    /// relationships the build reported in its `n_rels` column.
    #[instrument(skip(self, store), fields(schema_rows = self.schema.len()))]
    pub async fn rebuild(&self, store: &dyn GraphStore) -> Result<i64, CoreError> {
        info!("Cleansing the knowledge layer.");
        store.run_query(QUERY_DELETE_KG, None).await?;

        info!("Creating final knowledge layer.");
        let mut params = JsonRecord::new();
        params.insert("schema".into(), self.schema.to_param());
        let rows = store.run_query(&self.create_query, Some(params)).await?;

        let n_rels = rows
            .first()
            .and_then(|row| row.get("n_rels"))
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                GraphStoreError::MappingError("knowledge layer query returned no `n_rels`".into())
            })?;

        info!("Created {} relationships.", n_rels);
        Ok(n_rels)
    }
}
