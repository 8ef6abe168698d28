//! One provider request: credential and size checks, the call itself under
//! the run deadline, and at most one retry for transient failures.

use std::time::Duration;

use ingest::deadline::{Cancelled, Deadline};
use ingest::error::ErrorKind;
use tokio::time::Instant;

use super::report::AnalysisResult;
use crate::provider::{ApiKey, Prompt, ProviderClient, ProviderError, ProviderKind};

/// Attempts per request: the first call plus one retry.
const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: Duration,
    /// Off means transient failures are reported on the first attempt.
    pub retry_transient: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { backoff: Duration::from_secs(1), retry_transient: true }
    }
}

impl RetryPolicy {
    pub fn with_backoff(backoff: Duration) -> Self {
        Self { backoff, ..Default::default() }
    }

    pub fn no_retry() -> Self {
        Self { retry_transient: false, ..Default::default() }
    }
}

pub struct AnalysisRequest<'a> {
    pub provider: ProviderKind,
    pub prompt: &'a Prompt,
    pub key: Option<&'a ApiKey>,
}

fn cancelled(reason: Cancelled) -> ProviderError {
    ProviderError::new(ErrorKind::Cancelled, reason.to_string())
}

pub async fn submit(
    client: &dyn ProviderClient,
    request: AnalysisRequest<'_>,
    policy: &RetryPolicy,
    deadline: &Deadline,
) -> AnalysisResult {
    let started = Instant::now();
    let provider = request.provider;

    let Some(key) = request.key.filter(|k| !k.is_blank()) else {
        tracing::debug!(%provider, "no credential, skipping network call");
        return AnalysisResult::failure(
            provider.clone(),
            ProviderError::missing_credential(provider.as_str()),
            started.elapsed(),
            0,
        );
    };

    if let Some(limit) = client.max_prompt_bytes() {
        let size = request.prompt.len_bytes();
        if size > limit {
            return AnalysisResult::failure(
                provider,
                ProviderError::new(
                    ErrorKind::PayloadTooLarge,
                    format!("prompt is {} bytes, provider limit is {}", size, limit),
                ),
                started.elapsed(),
                0,
            );
        }
    }

    let mut attempts = 0;
    loop {
        attempts += 1;
        let outcome = match deadline.run(client.complete(request.prompt, key)).await {
            Ok(outcome) => outcome,
            Err(reason) => Err(cancelled(reason)),
        };

        let error = match outcome {
            Ok(text) => {
                tracing::debug!(%provider, attempts, "provider answered");
                return AnalysisResult::success(provider, text, started.elapsed(), attempts);
            }
            Err(e) => e,
        };

        let retry = policy.retry_transient && error.is_transient() && attempts < MAX_ATTEMPTS;
        if !retry {
            tracing::warn!(%provider, kind = %error.kind, attempts, "provider request failed");
            return AnalysisResult::failure(provider, error, started.elapsed(), attempts);
        }

        let backoff = deadline
            .remaining()
            .map_or(policy.backoff, |left| policy.backoff.min(left));
        tracing::warn!(
            %provider,
            kind = %error.kind,
            backoff_ms = backoff.as_millis() as u64,
            "transient provider failure, retrying once"
        );
        if let Err(reason) = deadline.sleep(backoff).await {
            return AnalysisResult::failure(provider, cancelled(reason), started.elapsed(), attempts);
        }
    }
}
