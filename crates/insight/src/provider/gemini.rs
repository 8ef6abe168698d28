//! Gemini: Google Generative Language API.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::http::{build_client, non_empty, post_json, Endpoint};
use super::{ApiKey, Prompt, ProviderClient, ProviderError, ProviderKind};
use crate::config::ProviderSettings;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: Endpoint,
}

impl GeminiClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let endpoint = Endpoint::from_settings(settings);
        Ok(Self { http: build_client(endpoint.timeout)?, endpoint })
    }

    fn request<'a>(&self, prompt: &'a Prompt) -> GenerateRequest<'a> {
        GenerateRequest {
            system_instruction: Content { role: None, parts: [Part { text: &prompt.system }] },
            contents: [Content { role: Some("user"), parts: [Part { text: &prompt.user }] }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens: self.endpoint.max_tokens,
            },
        }
    }

    fn path(&self) -> String {
        format!("/v1beta/models/{}:generateContent", self.endpoint.model)
    }
}

/// A blocked prompt comes back with no candidates or no content.
fn extract_text(response: GenerateResponse) -> Result<String, ProviderError> {
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| ProviderError::rejected("no candidates returned (prompt may have been blocked)"))?
        .parts;
    let text: Vec<String> = parts.into_iter().filter_map(|p| p.text).collect();
    non_empty(text.join(""), "gemini")
}

impl ProviderClient for GeminiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn max_prompt_bytes(&self) -> Option<usize> {
        self.endpoint.max_prompt_bytes
    }

    fn complete<'a>(&'a self, prompt: &'a Prompt, key: &'a ApiKey) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(async move {
            let url = self.endpoint.url(&self.path());
            tracing::debug!(model = %self.endpoint.model, bytes = prompt.len_bytes(), "calling gemini");
            let response: GenerateResponse = post_json(
                &self.http,
                &url,
                &[("x-goog-api-key", key.expose())],
                &self.request(prompt),
            )
            .await?;
            extract_text(response)
        })
    }
}
