//! Turns extraction envelopes into graph upsert operations.
//!
//! LLM output has no fixed property set. Every record therefore keeps all of its fields,
//! gains a few promoted ones (`_label_llm` / `_type_llm`, `wikipedia_url`) and carries a
//! `_all_properties` snapshot of everything user-visible, so the knowledge layer can show
//! the full statement without knowing its schema.

use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, error, warn};

use crate::{
    data::{
        errors::CoreError,
        extraction::{ExtractionEnvelope, ExtractionResult, Grouped, RawEntity, RawRelation},
        types::{property_safe, JsonRecord},
    },
    traits::graph_store::GraphQuery,
};

pub const WIKIPEDIA_BASE_URL: &str = "https://en.wikipedia.org/wiki/";

/// The query templates read from `<config>/queries/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplates {
    /// Records an `ExtractionError` for a document
    pub error: String,
    /// Upserts a document's entities
    pub entities: String,
    /// Upserts a document's relations
    pub relations: String,
    /// Builds the knowledge layer from the schema table
    pub create_kg: String,
}

impl QueryTemplates {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, CoreError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            error!("Directory with Cypher queries not found: {}", dir.display());
            return Err(CoreError::config_error_with_context(
                "query directory not found",
                dir,
                None::<std::io::Error>,
            ));
        }

        let read = |name: &str| -> Result<String, CoreError> {
            let path = dir.join(format!("{}.txt", name));
            debug!("Reading {} query.", name);
            std::fs::read_to_string(&path).map_err(|e| {
                error!("Missing query file: {}", path.display());
                CoreError::config_error_with_context("cannot read query file", &path, Some(e))
            })
        };

        Ok(Self {
            error: read("error")?,
            entities: read("entities")?,
            relations: read("relations")?,
            create_kg: read("create_kg")?,
        })
    }
}

/// Query Generator
#[derive(Debug, Clone)]
pub struct QueryGenerator {
    error_query: String,
    entities_query: String,
    relations_query: String,
}

impl QueryGenerator {
    pub fn new(templates: &QueryTemplates) -> Self {
        Self {
            error_query: templates.error.clone(),
            entities_query: templates.entities.clone(),
            relations_query: templates.relations.clone(),
        }
    }

    /// Operations that persist one extraction of the document `element_id`.
    ///
    /// A failure envelope yields a single error-record operation. A success envelope yields
    /// the entity and the relation operation, or nothing when either group is missing.
    pub fn generate(&self, element_id: &str, envelope: &ExtractionEnvelope) -> Vec<GraphQuery> {
        debug!("Generating Cypher from LLM output.");
        match envelope {
            ExtractionEnvelope::Failure(failure) => vec![GraphQuery::new(self.error_query.as_str())
                .with_json(json!({
                    "element_id": element_id,
                    "error": failure.error,
                    "response": failure.response,
                }))],
            ExtractionEnvelope::Success(result) => self.generate_success(element_id, result),
        }
    }

    fn generate_success(&self, element_id: &str, result: &ExtractionResult) -> Vec<GraphQuery> {
        let Some(entities) = &result.entities else {
            warn!(element_id, "Missing `entities` key in LLM output");
            return Vec::new();
        };
        let Some(relations) = &result.relations else {
            warn!(element_id, "Missing `relations` key in LLM output");
            return Vec::new();
        };

        let entities = normalize_entities(entities);
        let relations = normalize_relations(relations);
        let content_type = result.content_type.clone().map_or(Value::Null, property_safe);

        vec![
            GraphQuery::new(self.entities_query.as_str()).with_json(json!({
                "element_id": element_id,
                "entities": entities,
                "content_type": content_type,
            })),
            GraphQuery::new(self.relations_query.as_str()).with_json(json!({
                "element_id": element_id,
                "relations": relations,
            })),
        ]
    }
}

/// Flattens the category groups into one list of entity records. Entities without an id
/// cannot be addressed by relations or merged, so they are dropped.
pub fn normalize_entities(groups: &Grouped<RawEntity>) -> Vec<Value> {
    groups
        .iter()
        .flat_map(|(label, group)| group.iter().map(move |entity| (label, entity)))
        .filter(|(label, entity)| match entity.id() {
            None | Some(Value::Null) => {
                warn!(label = label.as_str(), name = ?entity.name(), "Dropping entity without `id`");
                false
            }
            Some(_) => true,
        })
        .map(|(label, entity)| Value::Object(normalize_entity(label, entity)))
        .collect()
}

/// Flattens the type groups into one list of relation records.
pub fn normalize_relations(groups: &Grouped<RawRelation>) -> Vec<Value> {
    groups
        .iter()
        .flat_map(|(rel_type, group)| {
            group.iter().map(move |relation| normalize_relation(rel_type, relation))
        })
        .map(Value::Object)
        .collect()
}

pub fn normalize_entity(label: &str, entity: &RawEntity) -> JsonRecord {
    let mut record = entity.0.clone();
    record.insert("_label_llm".into(), Value::String(label.trim().to_string()));
    if let Some(wikipedia_id) = entity.wikipedia_id() {
        record.insert(
            "wikipedia_url".into(),
            Value::String(format!("{}{}", WIKIPEDIA_BASE_URL, wikipedia_id)),
        );
    }
    let snapshot = all_properties(&record, &["id"]);
    record.insert("_all_properties".into(), Value::String(snapshot));
    make_storable(record)
}

pub fn normalize_relation(rel_type: &str, relation: &RawRelation) -> JsonRecord {
    let mut record = relation.0.clone();
    record.insert("_type_llm".into(), Value::String(rel_type.trim().to_string()));
    let snapshot = all_properties(&record, &["source", "target"]);
    record.insert("_all_properties".into(), Value::String(snapshot));
    make_storable(record)
}

/// JSON rendering of the user-visible fields: no `_`-prefixed keys and none of `excluded`.
/// Keys come out sorted, so the rendering is deterministic.
fn all_properties(record: &JsonRecord, excluded: &[&str]) -> String {
    let visible: JsonRecord = record
        .iter()
        .filter(|(key, _)| !key.starts_with('_') && !excluded.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Value::Object(visible).to_string()
}

fn make_storable(record: JsonRecord) -> JsonRecord {
    record
        .into_iter()
        .map(|(key, value)| (key, property_safe(value)))
        .collect()
}
