//! Shared HTTP plumbing for the built-in providers: client construction,
//! JSON POST, and status classification.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{classify_status, ProviderError};
use crate::config::ProviderSettings;

/// Longest slice of an error body kept in messages.
const ERROR_BODY_LIMIT: usize = 300;

/// Resolved per-provider endpoint settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub max_prompt_bytes: Option<usize>,
}

impl Endpoint {
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            timeout: Duration::from_secs(settings.timeout_secs),
            max_prompt_bytes: settings.max_prompt_bytes,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .build()
        .map_err(|e| ProviderError::unreachable(format!("failed to build HTTP client: {}", e)))
}

/// `error.message` from the usual provider error envelope, else the raw
/// body, cut to a readable length.
pub fn error_detail(body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());
    if detail.chars().count() > ERROR_BODY_LIMIT {
        let cut: String = detail.chars().take(ERROR_BODY_LIMIT).collect();
        format!("{}...", cut)
    } else {
        detail
    }
}

/// POST `body` as JSON and decode a JSON reply. Headers carry credentials
/// and are never logged.
pub async fn post_json<B, R>(
    client: &reqwest::Client,
    url: &str,
    headers: &[(&str, &str)],
    body: &B,
) -> Result<R, ProviderError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let mut request = client.post(url).json(body);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let kind = classify_status(status.as_u16());
        tracing::debug!(status = status.as_u16(), %kind, "provider returned an error status");
        return Err(ProviderError::new(
            kind,
            format!("HTTP {}: {}", status.as_u16(), error_detail(&body)),
        ));
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice::<R>(&bytes)
        .map_err(|e| ProviderError::rejected(format!("malformed response body: {}", e)))
}

/// An empty completion is as useless as a malformed one.
pub fn non_empty(text: String, provider: &str) -> Result<String, ProviderError> {
    if text.trim().is_empty() {
        Err(ProviderError::rejected(format!("{} returned an empty completion", provider)))
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_prefers_envelope_message() {
        let body = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        assert_eq!(error_detail(body), "invalid x-api-key");
    }

    #[test]
    fn test_error_detail_falls_back_to_body() {
        assert_eq!(error_detail("  Bad Gateway \n"), "Bad Gateway");
        let long = "x".repeat(1000);
        let detail = error_detail(&long);
        assert!(detail.ends_with("..."));
        assert_eq!(detail.len(), ERROR_BODY_LIMIT + 3);
    }

    #[test]
    fn test_endpoint_url_joins_cleanly() {
        let settings = ProviderSettings {
            base_url: "https://api.example.com/".into(),
            ..ProviderSettings::claude()
        };
        let endpoint = Endpoint::from_settings(&settings);
        assert_eq!(endpoint.url("/v1/messages"), "https://api.example.com/v1/messages");
        assert_eq!(endpoint.url("v1/messages"), "https://api.example.com/v1/messages");
    }

    #[test]
    fn test_non_empty() {
        assert!(non_empty("  \n".into(), "claude").is_err());
        assert_eq!(non_empty("ok".into(), "claude").unwrap(), "ok");
    }
}
