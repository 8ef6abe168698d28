use std::collections::HashMap;
use std::sync::Arc;

use super::chatgpt::ChatGptClient;
use super::claude::ClaudeClient;
use super::gemini::GeminiClient;
use super::{ProviderClient, ProviderError, ProviderKind};
use crate::config::ProvidersConfig;

/// Provider clients by kind. Shared read-only across a run.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    clients: HashMap<ProviderKind, Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three built-in HTTP clients.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, ProviderError> {
        let mut registry = Self::new();
        registry.register(Arc::new(ClaudeClient::new(&config.claude)?));
        registry.register(Arc::new(ChatGptClient::new(&config.chatgpt)?));
        registry.register(Arc::new(GeminiClient::new(&config.gemini)?));
        Ok(registry)
    }

    /// Adds or replaces the client for `client.kind()`.
    pub fn register(&mut self, client: Arc<dyn ProviderClient>) -> &mut Self {
        let kind = client.kind();
        if self.clients.insert(kind.clone(), client).is_some() {
            tracing::debug!(provider = %kind, "replaced registered provider client");
        }
        self
    }

    pub fn get(&self, kind: &ProviderKind) -> Option<Arc<dyn ProviderClient>> {
        self.clients.get(kind).cloned()
    }

    pub fn contains(&self, kind: &ProviderKind) -> bool {
        self.clients.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.clients.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry").field("kinds", &self.kinds()).finish()
    }
}
