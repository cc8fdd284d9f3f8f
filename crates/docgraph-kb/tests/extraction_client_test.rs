//! The extraction client against a stand-in for the OpenAI HTTP API.
#![cfg(feature = "adapters")]

use docgraph_kb::{
    adapters::OpenAiCompletionClient,
    services::extraction::{ExtractionClient, PromptTemplate},
    ExtractionEnvelope,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::config_dir;

fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "gpt-4",
        "system_fingerprint": null,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop",
            "logprobs": null
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

async fn client_for(server: &MockServer) -> ExtractionClient {
    let template = PromptTemplate::load(config_dir().join("prompts"), "generic_v4").unwrap();
    let completion = OpenAiCompletionClient::with_api_base("sk-test", server.uri());
    ExtractionClient::new(Arc::new(completion), template, 2000)
}

#[test_log::test(tokio::test)]
async fn test_successful_extraction_sends_few_shot_prompt() {
    let server = MockServer::start().await;
    let reply = json!({
        "content_type": "letter",
        "entities": {"Person": [{"id": "e1", "name": "Jane Doe", "wikipedia_id": "Jane_Doe"}]},
        "relations": {"WORKS_AT": [{"source": "e1", "target": "e2"}]}
    });
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "gpt-4", "temperature": 0.0, "max_tokens": 2000})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(&reply.to_string())))
        .expect(1)
        .mount(&server)
        .await;

    let envelope = client_for(&server).await.extract("Jane Doe works at Acme.", "gpt-4").await;

    match envelope {
        ExtractionEnvelope::Success(result) => {
            assert_eq!(result.entity_count(), 1);
            assert_eq!(result.relation_count(), 1);
            assert_eq!(result.content_type, Some(json!("letter")));
        }
        other => panic!("expected success, got {:?}", other),
    }

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let roles: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    assert_eq!(body["messages"][3]["content"], json!("Jane Doe works at Acme."));
}

#[tokio::test]
async fn test_upstream_error_becomes_failure_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "The model `gpt-5` does not exist",
                "type": "invalid_request_error",
                "param": null,
                "code": "model_not_found"
            }
        })))
        .mount(&server)
        .await;

    let envelope = client_for(&server).await.extract("some text", "gpt-5").await;

    match envelope {
        ExtractionEnvelope::Failure(failure) => {
            assert!(failure.error.starts_with("Completion request failed"), "{}", failure.error);
            assert_eq!(failure.response, "");
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_completion_keeps_raw_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("Here is what I found: Jane Doe (Person)")),
        )
        .mount(&server)
        .await;

    let envelope = client_for(&server).await.extract("some text", "gpt-4").await;

    match envelope {
        ExtractionEnvelope::Failure(failure) => {
            assert!(failure.error.starts_with("LLM output parsing (str -> JSON) failed with"));
            assert_eq!(failure.response, "Here is what I found: Jane Doe (Person)");
        }
        other => panic!("expected failure, got {:?}", other),
    }
}
