use std::time::Duration;

use ingest::error::ErrorKind;
use serde::{Deserialize, Serialize};

use super::sections::Assessment;
use crate::provider::{ProviderError, ProviderKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Failed,
}

/// One provider's outcome. `text` and `assessment` are set iff the call
/// succeeded; `error_kind` and `error_message` iff it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub provider: ProviderKind,
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub latency_ms: u64,
    /// Calls actually made; 0 when rejected before any network call.
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<Assessment>,
}

fn millis(latency: Duration) -> u64 {
    u64::try_from(latency.as_millis()).unwrap_or(u64::MAX)
}

impl AnalysisResult {
    pub fn success(provider: ProviderKind, text: String, latency: Duration, attempts: u32) -> Self {
        let assessment = Assessment::from_text(&text);
        Self {
            provider,
            status: ResultStatus::Success,
            text: Some(text),
            error_kind: None,
            error_message: None,
            latency_ms: millis(latency),
            attempts,
            assessment: Some(assessment),
        }
    }

    pub fn failure(provider: ProviderKind, error: ProviderError, latency: Duration, attempts: u32) -> Self {
        Self {
            provider,
            status: ResultStatus::Failed,
            text: None,
            error_kind: Some(error.kind),
            error_message: Some(error.message),
            latency_ms: millis(latency),
            attempts,
            assessment: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

/// Per-provider results in the order the providers were requested.
/// Serializes as a plain array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComparisonReport {
    pub results: Vec<AnalysisResult>,
}

impl ComparisonReport {
    pub fn new(results: Vec<AnalysisResult>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn get(&self, provider: &ProviderKind) -> Option<&AnalysisResult> {
        self.results.iter().find(|r| &r.provider == provider)
    }

    pub fn providers(&self) -> Vec<ProviderKind> {
        self.results.iter().map(|r| r.provider.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AssessmentLevel;

    fn report() -> ComparisonReport {
        ComparisonReport::new(vec![
            AnalysisResult::success(
                ProviderKind::Gemini,
                "=== Critical Issues ===\n- disk failure on sdb".into(),
                Duration::from_millis(1250),
                2,
            ),
            AnalysisResult::failure(
                ProviderKind::Claude,
                ProviderError::timeout("request timed out"),
                Duration::from_secs(30),
                2,
            ),
            AnalysisResult::failure(
                ProviderKind::ChatGpt,
                ProviderError::missing_credential("chatgpt"),
                Duration::ZERO,
                0,
            ),
        ])
    }

    #[test]
    fn test_success_and_failure_fields_are_exclusive() {
        let r = report();
        let ok = &r.results[0];
        assert!(ok.text.is_some() && ok.assessment.is_some());
        assert!(ok.error_kind.is_none() && ok.error_message.is_none());
        assert_eq!(ok.assessment.as_ref().unwrap().level, AssessmentLevel::Critical);

        let failed = &r.results[1];
        assert!(failed.text.is_none() && failed.assessment.is_none());
        assert_eq!(failed.error_kind, Some(ErrorKind::ProviderTimeout));
        assert_eq!(failed.latency_ms, 30_000);
    }

    #[test]
    fn test_counts() {
        let r = report();
        assert_eq!(r.len(), 3);
        assert_eq!(r.succeeded().count(), 1);
        assert_eq!(r.failed().count(), 2);
        assert_eq!(r.get(&ProviderKind::ChatGpt).unwrap().attempts, 0);
    }

    #[test]
    fn test_json_round_trip_preserves_order() {
        let r = report();
        let json = serde_json::to_string_pretty(&r).unwrap();
        assert!(json.trim_start().starts_with('['), "report serializes as an array");
        let back: ComparisonReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r, "field-for-field equal after round trip");
        assert_eq!(
            back.providers(),
            vec![ProviderKind::Gemini, ProviderKind::Claude, ProviderKind::ChatGpt]
        );
    }

    #[test]
    fn test_failed_entry_json_shape() {
        let value = serde_json::to_value(&report().results[1]).unwrap();
        assert_eq!(value["provider"], "claude");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error_kind"], "provider_timeout");
        assert!(value.get("text").is_none());
    }
}
