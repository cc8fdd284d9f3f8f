use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::data::errors::CompletionError;
use crate::traits::completion::{ChatMessage, CompletionClient};

/// One recorded call to [`ScriptedCompletionClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedCall {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub max_tokens: u32,
}

/// A completion client that replays queued replies in order and records what it was asked.
/// Once the queue is empty every call fails.
#[derive(Debug, Default)]
pub struct ScriptedCompletionClient {
    replies: Mutex<VecDeque<Result<String, CompletionError>>>,
    calls: Mutex<Vec<ScriptedCall>>,
}

impl ScriptedCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for reply in replies {
            client.push_reply(reply);
        }
        client
    }

    pub fn push_reply(&self, content: impl Into<String>) {
        self.replies.lock().push_back(Ok(content.into()));
    }

    pub fn push_error(&self, error: CompletionError) {
        self.replies.lock().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletionClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        max_tokens: u32,
    ) -> Result<String, CompletionError> {
        self.calls.lock().push(ScriptedCall {
            messages: messages.to_vec(),
            model: model.to_string(),
            max_tokens,
        });
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::RequestFailed("no scripted reply left".into())))
    }
}
