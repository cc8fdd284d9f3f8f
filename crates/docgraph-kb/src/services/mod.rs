//! Pipeline services of the document knowledge graph

pub mod crawler;
pub mod cypher;
pub mod extraction;
pub mod indices;
pub mod ingestion;
pub mod knowledge_layer;
pub mod pipeline;

// Re-exports
pub use crawler::DocumentCrawler;
pub use cypher::{QueryGenerator, QueryTemplates};
pub use extraction::{ExtractionClient, PromptTemplate};
pub use indices::index_queries;
pub use ingestion::{DocumentStoreWriter, ThrottlePolicy};
pub use knowledge_layer::{KnowledgeLayerBuilder, SchemaRow, SchemaTable};
pub use pipeline::KnowledgeGraph;
