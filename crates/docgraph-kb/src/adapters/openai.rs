use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::{
    data::errors::CompletionError,
    traits::completion::{ChatMessage, ChatRole, CompletionClient},
};

/// Chat completions through the OpenAI API.
pub struct OpenAiCompletionClient {
    client: Client<OpenAIConfig>,
}

impl OpenAiCompletionClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self { client: Client::with_config(config) }
    }

    /// Same as [`new`](Self::new) but against a different API base, e.g. a proxy or a test server.
    pub fn with_api_base(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key).with_api_base(api_base);
        Self { client: Client::with_config(config) }
    }
}

fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage, CompletionError> {
    let invalid = |e: async_openai::error::OpenAIError| CompletionError::InvalidRequest(e.to_string());
    let content = message.content.as_str();
    Ok(match message.role {
        ChatRole::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()
            .map_err(invalid)?
            .into(),
        ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map_err(invalid)?
            .into(),
        ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()
            .map_err(invalid)?
            .into(),
    })
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    #[instrument(skip(self, messages), fields(n_messages = messages.len()))]
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        max_tokens: u32,
    ) -> Result<String, CompletionError> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>, _>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .temperature(0.0)
            .max_tokens(u16::try_from(max_tokens).unwrap_or(u16::MAX))
            .build()
            .map_err(|e| CompletionError::InvalidRequest(e.to_string()))?;

        debug!("Calling model {} ...", model);
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| CompletionError::RequestFailed(e.to_string()))?;
        debug!(?response.usage, "Completion received");

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::EmptyResponse)
    }
}
