//! End-to-end orchestration: indices, ingestion, extraction and the knowledge layer.
//!
//! Each operation opens its own graph store handle through the [`GraphConnector`] and drops
//! it when the unit of work ends. Operations run inside a span carrying a fresh `run_id`.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::PipelineSettings,
    data::{
        errors::CoreError,
        extraction::ExtractionEnvelope,
        types::{ExtractionReport, IngestReport, JsonRecord},
    },
    services::{
        crawler::DocumentCrawler,
        cypher::{QueryGenerator, QueryTemplates},
        extraction::{ExtractionClient, PromptTemplate},
        indices::index_queries,
        ingestion::DocumentStoreWriter,
        knowledge_layer::{KnowledgeLayerBuilder, SchemaTable},
    },
    traits::{completion::CompletionClient, graph_store::GraphConnector},
};

/// Builds and maintains the document knowledge graph.
pub struct KnowledgeGraph {
    connector: Arc<dyn GraphConnector>,
    completion: Option<Arc<dyn CompletionClient>>,
    config_dir: PathBuf,
    settings: PipelineSettings,
    generator: QueryGenerator,
    layer: KnowledgeLayerBuilder,
}

impl KnowledgeGraph {
    /// Loads the query templates and the schema table from `config_dir`. Any missing resource
    /// fails construction.
    ///
    /// `completion` may be `None` for runs that never extract.
    pub fn new(
        connector: Arc<dyn GraphConnector>,
        completion: Option<Arc<dyn CompletionClient>>,
        config_dir: impl Into<PathBuf>,
        settings: PipelineSettings,
    ) -> Result<Self, CoreError> {
        let config_dir = config_dir.into();
        let templates = QueryTemplates::load(config_dir.join("queries"))?;
        let schema = SchemaTable::load(config_dir.join("schema.txt"))?;
        info!(
            config_dir = %config_dir.display(),
            schema_rows = schema.len(),
            "Knowledge graph configuration loaded"
        );

        Ok(Self {
            connector,
            completion,
            generator: QueryGenerator::new(&templates),
            layer: KnowledgeLayerBuilder::new(templates.create_kg, schema),
            config_dir,
            settings,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Creates the constraints and indices as one batch.
    #[instrument(name = "indices", skip(self), fields(run_id = %Uuid::new_v4()))]
    pub async fn initialise_indices(&self) -> Result<(), CoreError> {
        let queries = index_queries();
        let store = self.connector.open().await?;
        info!("Creating {} Neo4j indices & constraints.", queries.len());
        store.run_batch(&queries).await?;
        Ok(())
    }

    /// Crawls `data_dir` and stores its directories, files and pages.
    ///
    /// A missing directory is not an error: the run is logged and reports no files.
    #[instrument(
        name = "ingest",
        skip(self, data_dir),
        fields(run_id = %Uuid::new_v4(), data_dir = %data_dir.as_ref().display())
    )]
    pub async fn ingest_data(&self, data_dir: impl AsRef<Path>) -> Result<IngestReport, CoreError> {
        let data_dir = data_dir.as_ref();
        let Some(crawler) = DocumentCrawler::from_path(data_dir) else {
            warn!("Data directory not found: {}", data_dir.display());
            return Ok(IngestReport::default());
        };
        let content = crawler.crawl_and_identify();

        let store = self.connector.open().await?;
        let writer = DocumentStoreWriter::new(self.settings.throttle.clone());
        Ok(writer.ingest(store.as_ref(), &content).await)
    }

    /// Runs the LLM over every document returned by `data_query` and stores the results.
    ///
    /// The data query must return `element_id` and `text` columns. Per-document failures are
    /// logged and counted; only setup failures (prompt files, store connection, the data query
    /// itself) abort the run.
    #[instrument(name = "extract", skip(self, data_query), fields(run_id = %Uuid::new_v4()))]
    pub async fn extract_knowledge(
        &self,
        data_query: &str,
        model: &str,
        prompt_version: &str,
        max_tokens: u32,
    ) -> Result<ExtractionReport, CoreError> {
        let completion = self.completion.clone().ok_or_else(|| {
            CoreError::Config("knowledge extraction needs a completion client".to_string())
        })?;
        let template = PromptTemplate::load(self.config_dir.join("prompts"), prompt_version)?;
        let client = ExtractionClient::new(completion, template, max_tokens);

        let store = self.connector.open().await?;
        let documents = store.run_query(data_query, None).await?;
        info!("Extracting knowledge from {} documents.", documents.len());

        let mut report = ExtractionReport {
            documents: documents.len(),
            ..Default::default()
        };

        for document in &documents {
            let Some((element_id, text)) = document_fields(document) else {
                warn!("Data query row without `element_id`; skipping");
                report.skipped_malformed += 1;
                continue;
            };
            if text.chars().count() < self.settings.min_text_length {
                info!("Text too short in document with ID {}", element_id);
                report.too_short += 1;
                continue;
            }

            info!("Running LLM for document ID {}", element_id);
            let envelope = client.extract(text, model).await;
            let queries = self.generator.generate(element_id, &envelope);
            if queries.is_empty() {
                report.skipped_malformed += 1;
                continue;
            }

            match &envelope {
                ExtractionEnvelope::Success(result) => info!(
                    "Storing {} entities and {} relations to Neo4j.",
                    result.entity_count(),
                    result.relation_count()
                ),
                ExtractionEnvelope::Failure(_) => report.failed_extractions += 1,
            }

            match store.run_batch(&queries).await {
                Ok(_) => {
                    if !envelope.is_failure() {
                        report.extracted += 1;
                    }
                }
                Err(e) => {
                    error!(element_id, "Failed to store extraction results: {}", e);
                    report.store_failures += 1;
                }
            }
        }

        info!(
            extracted = report.extracted,
            too_short = report.too_short,
            failed_extractions = report.failed_extractions,
            skipped_malformed = report.skipped_malformed,
            store_failures = report.store_failures,
            "Extraction finished"
        );
        Ok(report)
    }

    /// Deletes and rebuilds the canonical layer; returns the relationship count.
    #[instrument(name = "knowledge_layer", skip(self), fields(run_id = %Uuid::new_v4()))]
    pub async fn create_knowledge_layer(&self) -> Result<i64, CoreError> {
        let store = self.connector.open().await?;
        self.layer.rebuild(store.as_ref()).await
    }
}

/// `element_id` and `text` of a data query row. A null or missing text reads as empty.
fn document_fields(row: &JsonRecord) -> Option<(&str, &str)> {
    let element_id = row.get("element_id")?.as_str()?;
    let text = row.get("text").and_then(Value::as_str).unwrap_or("");
    Some((element_id, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_fields() {
        let row = json!({"element_id": "4:abc:1", "text": "hello"});
        assert_eq!(document_fields(row.as_object().unwrap()), Some(("4:abc:1", "hello")));

        let row = json!({"element_id": "4:abc:2", "text": null});
        assert_eq!(document_fields(row.as_object().unwrap()), Some(("4:abc:2", "")));

        let row = json!({"text": "orphan"});
        assert_eq!(document_fields(row.as_object().unwrap()), None);
    }
}
