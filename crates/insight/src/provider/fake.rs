//! Scripted provider for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;

use super::{ApiKey, Prompt, ProviderClient, ProviderError, ProviderKind};

/// Plays back a fixed sequence of outcomes, one per call. The last outcome
/// repeats once the script runs out.
pub struct FakeProvider {
    kind: ProviderKind,
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    last: Mutex<Option<Result<String, ProviderError>>>,
    delay: Option<Duration>,
    max_prompt_bytes: Option<usize>,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new(kind: ProviderKind, script: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            kind,
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            delay: None,
            max_prompt_bytes: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn succeeding(kind: ProviderKind, text: &str) -> Self {
        Self::new(kind, vec![Ok(text.to_string())])
    }

    pub fn failing(kind: ProviderKind, error: ProviderError) -> Self {
        Self::new(kind, vec![Err(error)])
    }

    /// Each call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_max_prompt_bytes(mut self, limit: usize) -> Self {
        self.max_prompt_bytes = Some(limit);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> Result<String, ProviderError> {
        let mut script = self.script.lock().unwrap_or_else(|p| p.into_inner());
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        match script.pop_front() {
            Some(outcome) => {
                *last = Some(outcome.clone());
                outcome
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(ProviderError::rejected("fake provider has no scripted outcome"))),
        }
    }
}

impl ProviderClient for FakeProvider {
    fn kind(&self) -> ProviderKind {
        self.kind.clone()
    }

    fn max_prompt_bytes(&self) -> Option<usize> {
        self.max_prompt_bytes
    }

    fn complete<'a>(&'a self, _prompt: &'a Prompt, _key: &'a ApiKey) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.next_outcome()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> Prompt {
        Prompt { system: String::new(), user: "x".into(), groups_included: 0, truncated_groups: 0 }
    }

    #[tokio::test]
    async fn test_script_plays_in_order_then_repeats() {
        let fake = FakeProvider::new(
            ProviderKind::Claude,
            vec![Err(ProviderError::timeout("slow")), Ok("done".into())],
        );
        let key = ApiKey::new("k");
        assert!(fake.complete(&prompt(), &key).await.is_err());
        assert_eq!(fake.complete(&prompt(), &key).await.unwrap(), "done");
        assert_eq!(fake.complete(&prompt(), &key).await.unwrap(), "done", "last outcome repeats");
        assert_eq!(fake.calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_script_is_rejected() {
        let fake = FakeProvider::new(ProviderKind::Gemini, vec![]);
        let err = fake.complete(&prompt(), &ApiKey::new("k")).await.unwrap_err();
        assert_eq!(err.kind, ingest::error::ErrorKind::ProviderRejected);
    }
}
