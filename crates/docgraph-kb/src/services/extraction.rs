//! LLM entity and relation extraction with a fixed few-shot prompt.

use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::{
    data::{errors::CoreError, extraction::ExtractionEnvelope},
    traits::completion::{ChatMessage, CompletionClient},
};

/// Task instructions plus one worked example, loaded from
/// `{version}.txt`, `{version}_example.txt` and `{version}_example_output.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub task: String,
    pub example: String,
    pub example_output: String,
}

impl PromptTemplate {
    pub fn load(dir: impl AsRef<Path>, version: &str) -> Result<Self, CoreError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            error!("Prompt path {} does not exist or is not a directory.", dir.display());
            return Err(CoreError::config_error_with_context(
                "prompt directory not found",
                dir,
                None::<std::io::Error>,
            ));
        }

        let read = |suffix: &str| -> Result<String, CoreError> {
            let path = dir.join(format!("{}{}.txt", version, suffix));
            std::fs::read_to_string(&path).map_err(|e| {
                error!("Missing prompt file: {}", path.display());
                CoreError::config_error_with_context("cannot read prompt file", &path, Some(e))
            })
        };

        Ok(Self {
            task: read("")?,
            example: read("_example")?,
            example_output: read("_example_output")?,
        })
    }

    /// System task, example input, example output, then the actual input as the last user turn.
    pub fn messages(&self, input: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.task.as_str()),
            ChatMessage::user(self.example.as_str()),
            ChatMessage::assistant(self.example_output.as_str()),
            ChatMessage::user(input),
        ]
    }
}

/// Sends document text to the completion service and parses the reply.
///
/// Never fails: an unreachable service and an unparseable reply both come back as
/// [`ExtractionEnvelope::Failure`].
pub struct ExtractionClient {
    completion: Arc<dyn CompletionClient>,
    template: PromptTemplate,
    max_tokens: u32,
}

impl ExtractionClient {
    pub fn new(completion: Arc<dyn CompletionClient>, template: PromptTemplate, max_tokens: u32) -> Self {
        Self {
            completion,
            template,
            max_tokens,
        }
    }

    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn extract(&self, text: &str, model: &str) -> ExtractionEnvelope {
        let messages = self.template.messages(text);

        let started = Instant::now();
        let content = match self.completion.complete(&messages, model, self.max_tokens).await {
            Ok(content) => content,
            Err(e) => {
                error!("LLM API call failed: {}", e);
                debug!(query = %text, "Failed input");
                return ExtractionEnvelope::failure(e.to_string(), String::new());
            }
        };
        debug!("Query time: {:.1} sec", started.elapsed().as_secs_f64());

        let value: Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to parse LLM output: {}", e);
                debug!(response = %content, "Unparseable output");
                return ExtractionEnvelope::failure(
                    format!("LLM output parsing (str -> JSON) failed with: {}", e),
                    content,
                );
            }
        };

        match ExtractionEnvelope::from_value(value) {
            Ok(envelope) => {
                if let ExtractionEnvelope::Success(result) = &envelope {
                    for line in result.summary_lines() {
                        debug!("{}", line);
                    }
                }
                envelope
            }
            Err(e) => {
                error!("LLM output has an unexpected shape: {}", e);
                ExtractionEnvelope::failure(
                    format!("LLM output does not match the expected structure: {}", e),
                    content,
                )
            }
        }
    }
}
