//! Error types for the document graph knowledge base

use thiserror::Error;

/// Base Error type for core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration error: {message} (path: {path})")]
    ConfigWithContext {
        message: String,
        path: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Ingestion error with context: {message} (path: {path})")]
    IngestionWithContext {
        message: String,
        path: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    GraphStore(#[from] GraphStoreError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("Internal system error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Helper to create a configuration error pointing at the offending resource
    pub fn config_error_with_context<E>(
        message: impl Into<String>,
        path: impl AsRef<std::path::Path>,
        source: Option<E>,
    ) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CoreError::ConfigWithContext {
            message: message.into(),
            path: path.as_ref().display().to_string(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Helper to create an ingestion error with the file it happened on
    pub fn ingestion_error_with_context<E>(
        message: impl Into<String>,
        path: impl AsRef<std::path::Path>,
        source: Option<E>,
    ) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CoreError::IngestionWithContext {
            message: message.into(),
            path: path.as_ref().display().to_string(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }
}

/// Specific error type for the graph store (graph database interaction).
#[derive(Error, Debug)]
pub enum GraphStoreError {
    #[error("Graph database connection error: {0}")]
    ConnectionError(String),
    #[error("Graph query execution error: {0}")]
    QueryError(String),
    #[error("Data mapping error from graph result: {0}")]
    MappingError(String),
}

/// Error type for the text-completion service.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Completion request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid completion request: {0}")]
    InvalidRequest(String),
    #[error("Completion returned no content")]
    EmptyResponse,
}

/// Reasons a source page record cannot become a Page node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("page record has no `pageNumber` field")]
    MissingPageNumber,
    #[error("page record is not a JSON object")]
    NotAnObject,
}
