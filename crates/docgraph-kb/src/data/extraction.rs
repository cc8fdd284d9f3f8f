//! Shapes of the LLM extraction output.
//!
//! The completion service is asked for a JSON document of the form
//! `{"entities": {Category: [..]}, "relations": {TYPE: [..]}, "content_type": ..}`.
//! Any failure along the way is carried as `{"error": .., "response": ..}` instead.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::types::JsonRecord;

/// Records grouped by the category name the LLM assigned.
pub type Grouped<T> = BTreeMap<String, Vec<T>>;

/// One entity as returned by the LLM. Its property set is open-ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawEntity(pub JsonRecord);

impl RawEntity {
    /// LLM-local id, only meaningful within one extraction response.
    pub fn id(&self) -> Option<&Value> {
        self.0.get("id")
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// Present and non-null `wikipedia_id`.
    pub fn wikipedia_id(&self) -> Option<String> {
        match self.0.get("wikipedia_id") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

/// One relation as returned by the LLM; `source`/`target` are LLM-local entity ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRelation(pub JsonRecord);

impl RawRelation {
    pub fn source(&self) -> Option<&Value> {
        self.0.get("source")
    }

    pub fn target(&self) -> Option<&Value> {
        self.0.get("target")
    }
}

/// Success shape of an extraction. Either group may be absent when the LLM
/// answered with an incomplete document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub entities: Option<Grouped<RawEntity>>,
    #[serde(default)]
    pub relations: Option<Grouped<RawRelation>>,
    #[serde(default)]
    pub content_type: Option<Value>,
}

impl ExtractionResult {
    pub fn entity_count(&self) -> usize {
        self.entities.as_ref().map_or(0, |groups| groups.values().map(Vec::len).sum())
    }

    pub fn relation_count(&self) -> usize {
        self.relations.as_ref().map_or(0, |groups| groups.values().map(Vec::len).sum())
    }

    /// Human-readable digest: entity names per category, then one line per relation
    /// with its endpoints resolved to entity names.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec!["--- Entities ---".to_string()];
        let entities = self.entities.clone().unwrap_or_default();
        for (label, group) in &entities {
            let names: Vec<&str> = group.iter().filter_map(RawEntity::name).collect();
            lines.push(format!("{}: {:?}", label, names));
        }

        let name_of = |id: Option<&Value>| -> String {
            id.and_then(|id| {
                entities
                    .values()
                    .flatten()
                    .find(|entity| entity.id() == Some(id))
                    .and_then(RawEntity::name)
            })
            .unwrap_or("None")
            .to_string()
        };

        lines.push("--- Relations ---".to_string());
        for (rel_type, group) in self.relations.iter().flatten() {
            for relation in group {
                let extra: JsonRecord = relation
                    .0
                    .iter()
                    .filter(|(key, _)| key.as_str() != "source" && key.as_str() != "target")
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                lines.push(format!(
                    "{} - {} ({}) -> {}",
                    name_of(relation.source()),
                    rel_type.to_uppercase(),
                    Value::Object(extra),
                    name_of(relation.target()),
                ));
            }
        }
        lines
    }
}

/// Failure shape of an extraction: the message plus whatever the upstream returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    pub error: String,
    pub response: String,
}

/// Parsed outcome of one extraction call.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionEnvelope {
    Success(ExtractionResult),
    Failure(ExtractionFailure),
}

impl ExtractionEnvelope {
    pub fn failure(error: impl Into<String>, response: impl Into<String>) -> Self {
        Self::Failure(ExtractionFailure {
            error: error.into(),
            response: response.into(),
        })
    }

    /// Interprets a parsed JSON document. An `error` key always selects the failure
    /// shape, whatever else the document holds.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if let Some(error) = value.get("error") {
            let response = match value.get("response") {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(text)) => text.clone(),
                Some(other) => other.to_string(),
            };
            let error = match error {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            return Ok(Self::failure(error, response));
        }
        serde_json::from_value(value).map(Self::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}
