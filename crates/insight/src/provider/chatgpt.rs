//! ChatGPT: OpenAI Chat Completions API.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::http::{build_client, non_empty, post_json, Endpoint};
use super::{ApiKey, Prompt, ProviderClient, ProviderError, ProviderKind};
use crate::config::ProviderSettings;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatGptClient {
    http: reqwest::Client,
    endpoint: Endpoint,
}

impl ChatGptClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let endpoint = Endpoint::from_settings(settings);
        Ok(Self { http: build_client(endpoint.timeout)?, endpoint })
    }

    fn request<'a>(&'a self, prompt: &'a Prompt) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.endpoint.model,
            messages: [
                ChatMessage { role: "system", content: &prompt.system },
                ChatMessage { role: "user", content: &prompt.user },
            ],
            temperature: 0.0,
            max_tokens: self.endpoint.max_tokens,
        }
    }
}

fn extract_text(response: ChatCompletionResponse) -> Result<String, ProviderError> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::rejected("no choices returned in response"))?;
    non_empty(text, "chatgpt")
}

impl ProviderClient for ChatGptClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ChatGpt
    }

    fn max_prompt_bytes(&self) -> Option<usize> {
        self.endpoint.max_prompt_bytes
    }

    fn complete<'a>(&'a self, prompt: &'a Prompt, key: &'a ApiKey) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(async move {
            let url = self.endpoint.url("/v1/chat/completions");
            let bearer = format!("Bearer {}", key.expose());
            tracing::debug!(model = %self.endpoint.model, bytes = prompt.len_bytes(), "calling chatgpt");
            let response: ChatCompletionResponse = post_json(
                &self.http,
                &url,
                &[("Authorization", bearer.as_str())],
                &self.request(prompt),
            )
            .await?;
            extract_text(response)
        })
    }
}
