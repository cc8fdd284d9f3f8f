use docgraph_kb::{
    data::types::{CrawlResult, FileEntry},
    services::{
        crawler::DocumentCrawler,
        ingestion::{DocumentStoreWriter, QUERY_DIRS, QUERY_FILES},
    },
    test_utils::FakeGraphStore,
    ThrottlePolicy,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;

mod common;
use common::{pipeline, write_doc};

fn file_queries(store: &FakeGraphStore) -> Vec<docgraph_kb::GraphQuery> {
    store.executed_matching("MERGE (f:File")
}

fn pages_of(query: &docgraph_kb::GraphQuery) -> Vec<Value> {
    query.param("pages").and_then(Value::as_array).cloned().unwrap_or_default()
}

#[test_log::test(tokio::test)]
async fn test_ingest_repairs_and_skips_pages() {
    let tmp = TempDir::new().unwrap();
    write_doc(
        tmp.path(),
        "site/letters/doc.json",
        &json!([
            {"pageNumber": 1, "text": "  Dear Mr. Robinette  ", "words": [{"t": "Dear"}]},
            {"pageNumber": 2},
            {"text": "no page number"},
            {"pageNumber": 3, "text": "x", "id": "p-3", "meta": {"ocr": true}}
        ])
        .to_string(),
    );

    let content = DocumentCrawler::from_path(tmp.path()).unwrap().crawl_and_identify();
    let store = FakeGraphStore::new();
    let report = DocumentStoreWriter::new(ThrottlePolicy::disabled())
        .ingest(&store, &content)
        .await;

    assert_eq!(report.directory_pairs_stored, 2);
    assert_eq!(report.files_stored, 1);
    assert_eq!(report.pages_stored, 3);
    assert_eq!(report.pages_skipped, 1);
    assert_eq!(store.executed_matching(QUERY_DIRS).len(), 2);

    let files = file_queries(&store);
    assert_eq!(files.len(), 1);
    let file_path = tmp.path().join("site/letters/doc.json").to_string_lossy().into_owned();
    assert_eq!(files[0].param("id"), Some(&json!(file_path)));
    assert_eq!(files[0].param("name"), Some(&json!("doc.json")));
    assert_eq!(files[0].param("directory_name"), Some(&json!("letters")));

    let pages = pages_of(&files[0]);
    assert_eq!(
        pages[0],
        json!({
            "id": format!("{}__1", file_path),
            "others": {"pageNumber": 1, "text": "Dear Mr. Robinette"}
        })
    );
    assert_eq!(pages[1]["others"]["text"], json!(""));
    assert_eq!(pages[2]["others"]["id_page"], json!("p-3"));
    assert_eq!(pages[2]["others"]["meta"], json!("{\"ocr\":true}"));
    assert!(pages.iter().all(|p| p["others"].get("words").is_none()));
}

#[tokio::test]
async fn test_malformed_file_does_not_stop_the_run() {
    let tmp = TempDir::new().unwrap();
    write_doc(tmp.path(), "a_broken.json", "{not json");
    write_doc(tmp.path(), "b_good.json", r#"[{"pageNumber": 1, "text": "ok"}]"#);

    let content = DocumentCrawler::from_path(tmp.path()).unwrap().crawl_and_identify();
    let store = FakeGraphStore::new();
    let report = DocumentStoreWriter::new(ThrottlePolicy::disabled())
        .ingest(&store, &content)
        .await;

    assert_eq!(report.files_found, 2);
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.files_stored, 1);
    assert!(report.has_files());
    assert_eq!(file_queries(&store).len(), 1);
}

#[tokio::test]
async fn test_store_failures_are_counted_per_file() {
    let tmp = TempDir::new().unwrap();
    write_doc(tmp.path(), "d/1.json", r#"[{"pageNumber": 1}]"#);
    write_doc(tmp.path(), "d/2.json", r#"[{"pageNumber": 1}]"#);

    let content = DocumentCrawler::from_path(tmp.path()).unwrap().crawl_and_identify();
    let store = FakeGraphStore::new();
    store.fail_on("MERGE (f:File", "Unable to retrieve routing information");
    let report = DocumentStoreWriter::new(ThrottlePolicy::disabled())
        .ingest(&store, &content)
        .await;

    assert_eq!(report.files_failed, 2);
    assert_eq!(report.files_stored, 0);
    assert_eq!(report.directory_pairs_stored, 1);
    // "did any files exist", not "did any file succeed"
    assert!(report.has_files());
}

#[tokio::test]
async fn test_reingesting_issues_the_same_upserts() {
    let tmp = TempDir::new().unwrap();
    write_doc(tmp.path(), "d/1.json", r#"[{"pageNumber": 1, "text": "t"}]"#);
    let content = DocumentCrawler::from_path(tmp.path()).unwrap().crawl_and_identify();
    let writer = DocumentStoreWriter::new(ThrottlePolicy::disabled());

    let store = FakeGraphStore::new();
    writer.ingest(&store, &content).await;
    let first = store.executed();
    store.clear_log();
    writer.ingest(&store, &content).await;

    assert_eq!(store.executed(), first);
    assert!(QUERY_FILES.contains("MERGE (p:Page {id: page.id})"));
}

fn repeated_files(path: &str, count: usize) -> CrawlResult {
    CrawlResult {
        files: (0..count)
            .map(|_| FileEntry {
                name: "doc.json".into(),
                path: path.into(),
                directory: "/".into(),
            })
            .collect(),
        directory_pairs: Vec::new(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_throttle_pauses_twice_for_120_files() {
    let tmp = TempDir::new().unwrap();
    let path = write_doc(tmp.path(), "doc.json", r#"[{"pageNumber": 1}]"#);
    let content = repeated_files(&path.to_string_lossy(), 120);

    let writer = DocumentStoreWriter::new(ThrottlePolicy {
        every: 50,
        pause: Duration::from_secs(5),
    });
    let started = tokio::time::Instant::now();
    let report = writer.ingest(&FakeGraphStore::new(), &content).await;

    assert_eq!(report.files_stored, 120);
    assert_eq!(started.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_no_pause_after_the_last_file_or_when_disabled() {
    let tmp = TempDir::new().unwrap();
    let path = write_doc(tmp.path(), "doc.json", r#"[{"pageNumber": 1}]"#);

    let started = tokio::time::Instant::now();
    DocumentStoreWriter::new(ThrottlePolicy::default())
        .ingest(&FakeGraphStore::new(), &repeated_files(&path.to_string_lossy(), 50))
        .await;
    assert_eq!(started.elapsed(), Duration::ZERO);

    DocumentStoreWriter::new(ThrottlePolicy::disabled())
        .ingest(&FakeGraphStore::new(), &repeated_files(&path.to_string_lossy(), 120))
        .await;
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn test_pipeline_ingest_of_missing_directory_reports_nothing() {
    let (kg, connector) = pipeline(None);
    let tmp = TempDir::new().unwrap();

    let report = kg.ingest_data(tmp.path().join("missing")).await.unwrap();

    assert!(!report.has_files());
    assert_eq!(connector.open_count(), 0);
}

#[tokio::test]
async fn test_pipeline_ingest_opens_one_store_handle() {
    let (kg, connector) = pipeline(None);
    let tmp = TempDir::new().unwrap();
    write_doc(tmp.path(), "a/1.json", r#"[{"pageNumber": 1, "text": "t"}]"#);

    let report = kg.ingest_data(tmp.path()).await.unwrap();

    assert_eq!(report.files_stored, 1);
    assert_eq!(connector.open_count(), 1);
    assert_eq!(connector.store().executed().len(), 2);
}
