//! Writes the crawled Directory/File/Page hierarchy to the graph store.

use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    data::{
        errors::{CoreError, PageError},
        types::{CrawlResult, DirectoryPair, FileEntry, IngestReport, JsonRecord, PageRecord},
    },
    services::crawler::DocumentCrawler,
    traits::graph_store::GraphStore,
};

/// Upserts two directories and the containment edge between them.
pub const QUERY_DIRS: &str = "MERGE (d1:Directory {id: $id1}) SET d1.name = $name1
MERGE (d2:Directory {id: $id2}) SET d2.name = $name2
MERGE (d1)-[:CONTAINS_DIR]->(d2)";

/// Upserts one file with all of its pages. The parent directory is merged as well so
/// that files directly under the crawl root get attached too.
pub const QUERY_FILES: &str = "MERGE (d:Directory {id: $directory_id})
ON CREATE SET d.name = $directory_name
MERGE (f:File {id: $id})
SET f.name = $name
MERGE (d)-[:CONTAINS_FILE]->(f)
WITH f
UNWIND $pages AS page
MERGE (p:Page {id: page.id})
SET p += page.others
MERGE (f)-[:CONTAINS_PAGE]->(p)";

/// Pause policy for bulk file writes; hosted graph stores reject long bursts of sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottlePolicy {
    /// Pause after this many files; `0` disables throttling
    pub every: usize,
    pub pause: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            every: 50,
            pause: Duration::from_secs(5),
        }
    }
}

impl ThrottlePolicy {
    pub fn disabled() -> Self {
        Self {
            every: 0,
            pause: Duration::ZERO,
        }
    }

    fn should_pause(&self, processed: usize, remaining: usize) -> bool {
        self.every > 0 && remaining > 0 && processed % self.every == 0
    }
}

/// Parameters of one [`QUERY_FILES`] call plus page bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePayload {
    pub params: JsonRecord,
    pub pages_stored: usize,
    pub pages_skipped: usize,
}

/// Document Store Writer
pub struct DocumentStoreWriter {
    throttle: ThrottlePolicy,
}

impl DocumentStoreWriter {
    pub fn new(throttle: ThrottlePolicy) -> Self {
        Self { throttle }
    }

    /// Parameters for one directory pair.
    pub fn directory_params(pair: &DirectoryPair) -> JsonRecord {
        let mut params = JsonRecord::new();
        params.insert("id1".into(), Value::String(pair.source.clone()));
        params.insert("name1".into(), Value::String(pair.source_name()));
        params.insert("id2".into(), Value::String(pair.target.clone()));
        params.insert("name2".into(), Value::String(pair.target_name()));
        params
    }

    /// Reads a file and turns its records into the file upsert parameters.
    ///
    /// Pages without `text` are stored with an empty one; pages without `pageNumber` are
    /// dropped. Only an unreadable file is an error.
    pub fn file_payload(file: &FileEntry) -> Result<FilePayload, CoreError> {
        let records = DocumentCrawler::read_json(&file.path)?;

        let mut pages = Vec::with_capacity(records.len());
        let mut pages_skipped = 0;
        for record in records {
            match PageRecord::from_raw(&file.path, record) {
                Ok(page) => {
                    if page.text_was_missing {
                        warn!(file = %file.path, "A page in given file missing `text` field");
                    }
                    pages.push(page.to_param());
                }
                Err(PageError::MissingPageNumber) => {
                    error!(file = %file.path, "A page in given file missing `pageNumber` field");
                    pages_skipped += 1;
                }
                Err(e) => {
                    error!(file = %file.path, "Skipping page: {}", e);
                    pages_skipped += 1;
                }
            }
        }

        let pages_stored = pages.len();
        let params = json!({
            "id": file.path,
            "name": file.name,
            "directory_id": file.directory,
            "directory_name": crate::data::types::last_segment(&file.directory),
            "pages": pages,
        });
        let Value::Object(params) = params else {
            return Err(CoreError::Internal("file payload is not an object".to_string()));
        };

        Ok(FilePayload {
            params,
            pages_stored,
            pages_skipped,
        })
    }

    /// Stores a crawl result. Failures are logged per directory pair and per file and never
    /// abort the run.
    #[instrument(skip(self, store, content), fields(files = content.files.len()))]
    pub async fn ingest(&self, store: &dyn GraphStore, content: &CrawlResult) -> IngestReport {
        let mut report = IngestReport {
            files_found: content.files.len(),
            ..Default::default()
        };

        info!(
            "Storing directory structure ({} dir-subdir pairs).",
            content.directory_pairs.len()
        );
        for pair in &content.directory_pairs {
            match store.run_query(QUERY_DIRS, Some(Self::directory_params(pair))).await {
                Ok(_) => report.directory_pairs_stored += 1,
                Err(e) => {
                    error!(source = %pair.source, target = %pair.target, "Failure when storing a directory pair: {}", e);
                    report.directory_pairs_failed += 1;
                }
            }
        }

        info!("Storing {} files.", content.files.len());
        for (index, file) in content.files.iter().enumerate() {
            match self.store_file(store, file).await {
                Ok((stored, skipped)) => {
                    report.files_stored += 1;
                    report.pages_stored += stored;
                    report.pages_skipped += skipped;
                }
                Err(e) => {
                    error!(file = %file.path, "Failure when storing a file: {}", e);
                    report.files_failed += 1;
                }
            }

            let processed = index + 1;
            if self.throttle.should_pause(processed, content.files.len() - processed) {
                info!(
                    "Pausing {:?} after {} files to stay under the store's rate limits.",
                    self.throttle.pause, processed
                );
                tokio::time::sleep(self.throttle.pause).await;
            }
        }

        info!(
            files_stored = report.files_stored,
            files_failed = report.files_failed,
            pages_stored = report.pages_stored,
            pages_skipped = report.pages_skipped,
            "Ingestion finished"
        );
        report
    }

    async fn store_file(
        &self,
        store: &dyn GraphStore,
        file: &FileEntry,
    ) -> Result<(usize, usize), CoreError> {
        let payload = Self::file_payload(file)?;
        if let Err(e) = store.run_query(QUERY_FILES, Some(payload.params.clone())).await {
            debug!(content = ?payload.params, "Failed file payload");
            return Err(e.into());
        }
        Ok((payload.pages_stored, payload.pages_skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_should_pause_every_n_files_with_work_left() {
        let throttle = ThrottlePolicy::default();
        assert!(!throttle.should_pause(49, 10));
        assert!(throttle.should_pause(50, 10));
        assert!(!throttle.should_pause(50, 0));
        assert!(throttle.should_pause(100, 1));
        assert!(!ThrottlePolicy::disabled().should_pause(50, 10));
    }

    #[test]
    fn test_directory_params_use_last_segment_as_name() {
        let params = DocumentStoreWriter::directory_params(&DirectoryPair {
            source: "/data/reports".into(),
            target: "/data/reports/2021".into(),
        });

        assert_eq!(params["id1"], json!("/data/reports"));
        assert_eq!(params["name1"], json!("reports"));
        assert_eq!(params["id2"], json!("/data/reports/2021"));
        assert_eq!(params["name2"], json!("2021"));
    }
}
