//! Adapters implementation for external services

pub mod neo4j_store;
pub mod openai;

// Re-export adapters for easier import
pub use neo4j_store::{Neo4jConnector, Neo4jGraphStore};
pub use openai::OpenAiCompletionClient;
