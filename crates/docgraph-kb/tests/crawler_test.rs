use docgraph_kb::services::crawler::DocumentCrawler;
use docgraph_kb::data::types::DirectoryPair;
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use tempfile::TempDir;

mod common;
use common::write_doc;

#[test]
fn test_pairs_are_unique_when_files_share_directories() {
    let tmp = TempDir::new().unwrap();
    for name in ["1.json", "2.json", "3.json"] {
        write_doc(tmp.path(), &format!("reports/2021/q1/{}", name), "[]");
    }
    write_doc(tmp.path(), "reports/2021/q2/4.json", "[]");

    let result = DocumentCrawler::from_path(tmp.path()).unwrap().crawl_and_identify();

    assert_eq!(result.files.len(), 4);
    let unique: HashSet<&DirectoryPair> = result.directory_pairs.iter().collect();
    assert_eq!(unique.len(), result.directory_pairs.len());
    // root -> reports -> 2021 -> {q1, q2}
    assert_eq!(result.directory_pairs.len(), 4);
    for pair in &result.directory_pairs {
        assert_eq!(
            std::path::Path::new(&pair.target).parent().unwrap().to_string_lossy(),
            pair.source
        );
    }
}

#[test]
fn test_files_in_root_produce_no_pairs() {
    let tmp = TempDir::new().unwrap();
    write_doc(tmp.path(), "a.json", "[]");

    let result = DocumentCrawler::from_path(tmp.path()).unwrap().crawl_and_identify();
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].directory, tmp.path().to_string_lossy());
    assert!(result.directory_pairs.is_empty());
}

#[test]
fn test_relative_root_yields_absolute_identities() {
    // Integration tests run from the crate directory, which ships a `config` folder.
    let crawler = DocumentCrawler::from_path("config").unwrap();
    assert!(crawler.root().is_absolute());

    let result = crawler.crawl_and_identify();
    assert!(result.files.iter().all(|f| std::path::Path::new(&f.path).is_absolute()));
}

#[test]
fn test_missing_root_is_absent_not_an_error() {
    let tmp = TempDir::new().unwrap();
    assert!(DocumentCrawler::from_path(tmp.path().join("missing")).is_none());
}
