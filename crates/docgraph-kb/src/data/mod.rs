//! Core data structures for the document graph knowledge base

pub mod errors;
pub mod extraction;
pub mod types;

// Re-export all common types
pub use errors::{CompletionError, CoreError, GraphStoreError, PageError};
pub use extraction::{
    ExtractionEnvelope, ExtractionFailure, ExtractionResult, Grouped, RawEntity, RawRelation,
};
pub use types::{
    CrawlResult, DirectoryPair, ExtractionReport, FileEntry, IngestReport, JsonRecord, PageRecord,
};
