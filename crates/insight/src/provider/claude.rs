//! Claude: Anthropic Messages API.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::http::{build_client, non_empty, post_json, Endpoint};
use super::{ApiKey, Prompt, ProviderClient, ProviderError, ProviderKind};
use crate::config::ProviderSettings;

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct ClaudeClient {
    http: reqwest::Client,
    endpoint: Endpoint,
}

impl ClaudeClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let endpoint = Endpoint::from_settings(settings);
        Ok(Self { http: build_client(endpoint.timeout)?, endpoint })
    }

    fn request<'a>(&'a self, prompt: &'a Prompt) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.endpoint.model,
            max_tokens: self.endpoint.max_tokens,
            temperature: 0.0,
            system: &prompt.system,
            messages: [Message { role: "user", content: &prompt.user }],
        }
    }
}

/// Text blocks joined in order; tool-use and other block types are ignored.
fn extract_text(response: MessagesResponse) -> Result<String, ProviderError> {
    let text: Vec<String> = response
        .content
        .into_iter()
        .filter(|b| b.kind == "text")
        .filter_map(|b| b.text)
        .collect();
    non_empty(text.join("\n"), "claude")
}

impl ProviderClient for ClaudeClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn max_prompt_bytes(&self) -> Option<usize> {
        self.endpoint.max_prompt_bytes
    }

    fn complete<'a>(&'a self, prompt: &'a Prompt, key: &'a ApiKey) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(async move {
            let url = self.endpoint.url("/v1/messages");
            tracing::debug!(model = %self.endpoint.model, bytes = prompt.len_bytes(), "calling claude");
            let response: MessagesResponse = post_json(
                &self.http,
                &url,
                &[("x-api-key", key.expose()), ("anthropic-version", API_VERSION)],
                &self.request(prompt),
            )
            .await?;
            extract_text(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> Prompt {
        Prompt { system: "sys".into(), user: "logs".into(), groups_included: 1, truncated_groups: 0 }
    }

    #[test]
    fn test_request_shape() {
        let client = ClaudeClient::new(&ProviderSettings::claude()).unwrap();
        let p = prompt();
        let body = serde_json::to_value(client.request(&p)).unwrap();
        assert_eq!(body["model"], "claude-3-opus-20240229");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["system"], "sys");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "logs");
    }

    #[test]
    fn test_extract_text_joins_text_blocks() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"=== Overall Assessment ==="},{"type":"tool_use","id":"x"},{"type":"text","text":"All good."}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "=== Overall Assessment ===\nAll good.");
    }

    #[test]
    fn test_empty_content_is_rejected() {
        let response: MessagesResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        let err = extract_text(response).unwrap_err();
        assert_eq!(err.kind, ingest::error::ErrorKind::ProviderRejected);
    }
}
