//! Finds JSON documents under a root directory and derives the directory tree around them.

use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::data::{
    errors::CoreError,
    types::{CrawlResult, DirectoryPair, FileEntry},
};

/// File name suffix of the source documents
pub const DOCUMENT_SUFFIX: &str = ".json";

/// Keys dropped from every source record (too verbose to store)
pub const IGNORED_KEYS: &[&str] = &["words"];

/// Crawler over one root directory.
#[derive(Debug, Clone)]
pub struct DocumentCrawler {
    root: PathBuf,
}

impl DocumentCrawler {
    /// Returns `None` when `path` does not exist or is not a directory.
    ///
    /// A relative root is joined onto the working directory without further normalisation.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return None;
        }
        let root = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().ok()?.join(path)
        };
        Some(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists every document below the root and every directory-subdirectory pair on the
    /// way from the root down to each document's directory.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn crawl_and_identify(&self) -> CrawlResult {
        debug!("Crawling directory structure.");

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            let path = entry.path();
            if !is_document(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let directory = path.parent().unwrap_or(&self.root);
            files.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: path.to_string_lossy().into_owned(),
                directory: directory.to_string_lossy().into_owned(),
            });
        }

        let mut pairs = BTreeSet::new();
        for file in &files {
            let mut dir = Path::new(&file.directory);
            while dir != self.root {
                let Some(parent) = dir.parent() else { break };
                pairs.insert(DirectoryPair {
                    source: parent.to_string_lossy().into_owned(),
                    target: dir.to_string_lossy().into_owned(),
                });
                dir = parent;
            }
        }

        debug!(files = files.len(), directory_pairs = pairs.len(), "Crawl finished");
        CrawlResult {
            files,
            directory_pairs: pairs.into_iter().collect(),
        }
    }

    /// Reads one document: a JSON array of page records (a lone object counts as one record).
    /// Keys in [`IGNORED_KEYS`] are removed from every record; everything else is kept as is.
    pub fn read_json(path: impl AsRef<Path>) -> Result<Vec<Value>, CoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ingestion_error_with_context("Failed to read document", path, Some(e))
        })?;
        let parsed: Value = serde_json::from_str(&content).map_err(|e| {
            CoreError::ingestion_error_with_context("Document is not valid JSON", path, Some(e))
        })?;

        let mut records = match parsed {
            Value::Array(records) => records,
            record @ Value::Object(_) => vec![record],
            _ => {
                return Err(CoreError::ingestion_error_with_context(
                    "Document is neither a JSON array nor an object",
                    path,
                    None::<std::io::Error>,
                ))
            }
        };

        for record in records.iter_mut().filter_map(Value::as_object_mut) {
            for key in IGNORED_KEYS {
                record.remove(*key);
            }
        }
        Ok(records)
    }
}

/// Matches on the name suffix, so a bare `.json` counts as a document too.
fn is_document(file_name: &str) -> bool {
    file_name.ends_with(DOCUMENT_SUFFIX)
}
