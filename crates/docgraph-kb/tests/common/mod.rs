//! Shared fixtures for the integration tests
#![allow(dead_code)]

use docgraph_kb::{
    test_utils::{FakeConnector, FakeGraphStore},
    CompletionClient, JsonRecord, KnowledgeGraph, PipelineSettings, ThrottlePolicy,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The configuration resources shipped with the crate.
pub fn config_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config")
}

pub fn record(value: Value) -> JsonRecord {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

/// Writes `content` to `root/rel`, creating parent directories.
pub fn write_doc(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

pub fn quiet_settings() -> PipelineSettings {
    PipelineSettings {
        throttle: ThrottlePolicy::disabled(),
        ..PipelineSettings::default()
    }
}

/// A pipeline over a fresh fake store, using the shipped configuration.
pub fn pipeline(completion: Option<Arc<dyn CompletionClient>>) -> (KnowledgeGraph, FakeConnector) {
    let connector = FakeConnector::new(FakeGraphStore::new());
    let kg = KnowledgeGraph::new(
        Arc::new(connector.clone()),
        completion,
        config_dir(),
        quiet_settings(),
    )
    .expect("shipped configuration loads");
    (kg, connector)
}
