//! Document knowledge graph
//!
//! Crawls a tree of JSON documents into a graph store as Directory/File/Page nodes, extracts
//! entities and relations from page text with an LLM, and rebuilds a schema-driven knowledge
//! layer on top of the raw extraction graph.

// Core modules
pub mod config;
pub mod data;
pub mod services;
pub mod traits;

// Implementation adapters (optional, can be provided externally)
#[cfg(feature = "adapters")]
pub mod adapters;

pub mod test_utils;

// Re-export key types for convenient usage
pub use config::{KgConfig, Neo4jConfig, OpenAiSettings, PipelineSettings};
pub use data::errors::{CompletionError, CoreError, GraphStoreError, PageError};
pub use data::extraction::{ExtractionEnvelope, ExtractionFailure, ExtractionResult};
pub use data::types::{CrawlResult, ExtractionReport, IngestReport, JsonRecord};

// Re-export core traits
pub use traits::{ChatMessage, ChatRole, CompletionClient, GraphConnector, GraphQuery, GraphStore};

// Re-export core services
pub use services::{
    DocumentCrawler, DocumentStoreWriter, ExtractionClient, KnowledgeGraph, KnowledgeLayerBuilder,
    PromptTemplate, QueryGenerator, QueryTemplates, SchemaTable, ThrottlePolicy,
};

/// Initialize tracing. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init();
}
