use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use ingest::deadline::Deadline;
use ingest::error::ErrorKind;
use ingest::record::Record;
use tracing::Instrument;

use super::context::AnalysisContext;
use super::prompt::PromptBuilder;
use super::report::{AnalysisResult, ComparisonReport};
use super::submit::{submit, AnalysisRequest, RetryPolicy};
use super::AnalysisError;
use crate::provider::{Credentials, ProviderClient, ProviderError, ProviderKind, ProviderRegistry};

/// Fans one prompt out to every requested provider and collects every
/// outcome, in request order.
pub struct Orchestrator {
    registry: ProviderRegistry,
    credentials: Credentials,
    policy: RetryPolicy,
    prompt_builder: PromptBuilder,
}

impl Orchestrator {
    pub fn new(
        registry: ProviderRegistry,
        credentials: Credentials,
        policy: RetryPolicy,
        prompt_builder: PromptBuilder,
    ) -> Self {
        Self { registry, credentials, policy, prompt_builder }
    }

    /// Only run-level problems are errors: no providers, an unregistered
    /// provider, or the sole requested provider lacking a key. Everything
    /// else becomes a failed entry.
    pub async fn analyze(
        &self,
        records: &[Record],
        providers: &[ProviderKind],
        context: &AnalysisContext,
        deadline: &Deadline,
    ) -> Result<ComparisonReport, AnalysisError> {
        let mut requested: Vec<(ProviderKind, Arc<dyn ProviderClient>)> = Vec::with_capacity(providers.len());
        for kind in providers {
            if requested.iter().any(|(k, _)| k == kind) {
                continue;
            }
            let client = self
                .registry
                .get(kind)
                .ok_or_else(|| AnalysisError::UnknownProvider(kind.clone()))?;
            requested.push((kind.clone(), client));
        }

        match requested.as_slice() {
            [] => return Err(AnalysisError::NoProviders),
            [(only, _)] if !self.credentials.contains(only) => {
                return Err(AnalysisError::missing_credential(only));
            }
            _ => {}
        }

        let prompt = match self.prompt_builder.build(records, context) {
            Ok(prompt) => prompt,
            Err(AnalysisError::PayloadTooLarge { size, limit }) => {
                tracing::warn!(size, limit, "prompt exceeds the ceiling with no log groups left");
                let error = ProviderError::new(
                    ErrorKind::PayloadTooLarge,
                    format!("prompt is {} bytes even after truncation, ceiling is {}", size, limit),
                );
                let results = requested
                    .into_iter()
                    .map(|(kind, _)| AnalysisResult::failure(kind, error.clone(), Duration::ZERO, 0))
                    .collect();
                return Ok(ComparisonReport::new(results));
            }
            Err(other) => return Err(other),
        };

        tracing::info!(
            providers = requested.len(),
            groups = prompt.groups_included,
            truncated = prompt.truncated_groups,
            bytes = prompt.len_bytes(),
            "submitting analysis"
        );

        let calls = requested.iter().map(|(kind, client)| {
            let request = AnalysisRequest {
                provider: kind.clone(),
                prompt: &prompt,
                key: self.credentials.get(kind),
            };
            submit(client.as_ref(), request, &self.policy, deadline)
                .instrument(tracing::debug_span!("provider", provider = %kind))
        });
        let report = ComparisonReport::new(join_all(calls).await);

        tracing::info!(
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            "analysis finished"
        );
        Ok(report)
    }
}
