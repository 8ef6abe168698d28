//! Analysis: prompt assembly, per-provider submission with retry, and
//! the ordered comparison of provider outcomes.

pub mod context;
pub mod orchestrator;
pub mod prompt;
pub mod report;
pub mod sections;
pub mod submit;

use std::path::PathBuf;

use ingest::error::ErrorKind;
use thiserror::Error;

use crate::provider::ProviderKind;

pub use context::AnalysisContext;
pub use orchestrator::Orchestrator;
pub use prompt::PromptBuilder;
pub use report::{AnalysisResult, ComparisonReport, ResultStatus};
pub use sections::{Assessment, AssessmentLevel, Section};
pub use submit::{submit, AnalysisRequest, RetryPolicy};

/// Run-level analysis failures. Per-provider failures never surface here;
/// they become failed entries in the [`ComparisonReport`].
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("no AI provider requested")]
    NoProviders,
    #[error("unknown AI provider '{0}'")]
    UnknownProvider(ProviderKind),
    #[error("no API key for {provider}: pass --api-key, set api_keys.{provider} in the config file{env_hint}")]
    MissingCredential { provider: ProviderKind, env_hint: String },
    #[error("prompt is {size} bytes, over the {limit} byte ceiling even with every log group dropped")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("cannot read system info from {path}: {reason}")]
    SystemInfo { path: PathBuf, reason: String },
}

impl AnalysisError {
    pub fn missing_credential(provider: &ProviderKind) -> Self {
        let env_hint = provider
            .env_var()
            .map(|var| format!(" or export {}", var))
            .unwrap_or_default();
        AnalysisError::MissingCredential { provider: provider.clone(), env_hint }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::MissingCredential { .. } => ErrorKind::MissingCredential,
            AnalysisError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            AnalysisError::NoProviders
            | AnalysisError::UnknownProvider(_)
            | AnalysisError::SystemInfo { .. } => ErrorKind::ProviderRejected,
        }
    }
}
