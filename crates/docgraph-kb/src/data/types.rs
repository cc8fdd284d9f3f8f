//! Document-side data types: crawl output, page records and run reports.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

use super::errors::PageError;

/// A JSON object as read from a source document or returned by the graph store.
pub type JsonRecord = serde_json::Map<String, Value>;

/// A document file found by the crawler.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileEntry {
    /// Last path segment, e.g. `report.json`
    pub name: String,
    /// Absolute file path; the identity of the File node
    pub path: String,
    /// Absolute path of the containing directory
    pub directory: String,
}

/// A containment edge between a directory and one of its immediate subdirectories.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DirectoryPair {
    pub source: String,
    pub target: String,
}

impl DirectoryPair {
    pub fn source_name(&self) -> String {
        last_segment(&self.source)
    }

    pub fn target_name(&self) -> String {
        last_segment(&self.target)
    }
}

/// Everything the crawler found under one root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub files: Vec<FileEntry>,
    pub directory_pairs: Vec<DirectoryPair>,
}

/// Last segment of a path string, independent of the platform separator.
/// The filesystem root has no name and yields an empty string.
pub fn last_segment(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Makes a JSON value storable as a graph property.
///
/// Graph properties may hold scalars and homogeneous lists of scalars only, so
/// objects and lists containing objects or lists are replaced by their JSON text.
pub fn property_safe(value: Value) -> Value {
    match value {
        Value::Object(_) => Value::String(value.to_string()),
        Value::Array(ref items) if items.iter().any(|v| v.is_object() || v.is_array()) => {
            Value::String(value.to_string())
        }
        other => other,
    }
}

/// A validated page, ready to be merged as a Page node.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    /// `{file_path}__{pageNumber}`
    pub id: String,
    /// All remaining page attributes
    pub properties: JsonRecord,
    /// The source record had no `text`; an empty string was stored instead
    pub text_was_missing: bool,
}

impl PageRecord {
    /// Validates and repairs one raw page record of the file at `file_path`.
    ///
    /// `text` is trimmed (or defaulted to `""`), a source `id` is kept as `id_page`,
    /// and nested values are stringified. Records without `pageNumber` are rejected.
    pub fn from_raw(file_path: &str, raw: Value) -> Result<Self, PageError> {
        let Value::Object(mut page) = raw else {
            return Err(PageError::NotAnObject);
        };

        let (text, text_was_missing) = match page.remove("text") {
            Some(Value::String(text)) => (text.trim().to_string(), false),
            None | Some(Value::Null) => (String::new(), true),
            Some(other) => (other.to_string(), false),
        };
        page.insert("text".to_string(), Value::String(text));

        let page_number = match page.get("pageNumber") {
            None | Some(Value::Null) => return Err(PageError::MissingPageNumber),
            Some(Value::String(number)) => number.clone(),
            Some(other) => other.to_string(),
        };

        if let Some(id) = page.remove("id") {
            page.insert("id_page".to_string(), id);
        }

        let properties = page
            .into_iter()
            .map(|(key, value)| (key, property_safe(value)))
            .collect();

        Ok(Self {
            id: format!("{}__{}", file_path, page_number),
            properties,
            text_was_missing,
        })
    }

    /// Shape expected by the file upsert query: `{id, others}`.
    pub fn to_param(&self) -> Value {
        json!({
            "id": self.id,
            "others": Value::Object(self.properties.clone()),
        })
    }
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub directory_pairs_stored: usize,
    pub directory_pairs_failed: usize,
    pub files_found: usize,
    pub files_stored: usize,
    pub files_failed: usize,
    pub pages_stored: usize,
    pub pages_skipped: usize,
}

impl IngestReport {
    /// True when the crawl found at least one file, whether or not it was stored.
    pub fn has_files(&self) -> bool {
        self.files_found > 0
    }
}

/// Outcome of one knowledge-extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub documents: usize,
    pub too_short: usize,
    pub extracted: usize,
    pub failed_extractions: usize,
    pub skipped_malformed: usize,
    pub store_failures: usize,
}
