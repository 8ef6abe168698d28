//! Credentials: provider API keys, resolved once per run and shared
//! read-only by every provider call.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::ProviderKind;

/// An API key. Prints as `***`; only [`ApiKey::expose`] yields the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// First four characters then `...`; short keys are fully hidden.
    pub fn masked(&self) -> String {
        if self.0.chars().count() < 8 {
            return "***".to_string();
        }
        let head: String = self.0.chars().take(4).collect();
        format!("{}...", head)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Where a resolved key came from, for `--show-config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    CommandLine,
    ConfigFile,
    Environment,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeySource::CommandLine => "--api-key",
            KeySource::ConfigFile => "config",
            KeySource::Environment => "environment",
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    keys: HashMap<ProviderKind, (ApiKey, KeySource)>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ProviderKind, key: ApiKey, source: KeySource) {
        if !key.is_blank() {
            self.keys.insert(kind, (key, source));
        }
    }

    pub fn with(mut self, kind: ProviderKind, key: &str) -> Self {
        self.insert(kind, ApiKey::new(key), KeySource::ConfigFile);
        self
    }

    /// Precedence: explicit key for one provider, then `api_keys.<name>`
    /// from config, then the provider's well-known environment variable.
    /// Blank values at any level are skipped.
    pub fn resolve<F>(
        providers: &[ProviderKind],
        explicit: Option<(&ProviderKind, &str)>,
        configured: &BTreeMap<String, String>,
        env: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut creds = Self::new();
        for kind in providers {
            if let Some((target, key)) = explicit {
                if target == kind && !key.trim().is_empty() {
                    creds.insert(kind.clone(), ApiKey::new(key), KeySource::CommandLine);
                    continue;
                }
            }
            if let Some(key) = configured.get(kind.as_str()).filter(|k| !k.trim().is_empty()) {
                creds.insert(kind.clone(), ApiKey::new(key.clone()), KeySource::ConfigFile);
                continue;
            }
            if let Some(key) = kind.env_var().and_then(&env).filter(|k| !k.trim().is_empty()) {
                creds.insert(kind.clone(), ApiKey::new(key), KeySource::Environment);
            }
        }
        creds
    }

    pub fn get(&self, kind: &ProviderKind) -> Option<&ApiKey> {
        self.keys.get(kind).map(|(key, _)| key)
    }

    pub fn source(&self, kind: &ProviderKind) -> Option<KeySource> {
        self.keys.get(kind).map(|(_, source)| *source)
    }

    pub fn contains(&self, kind: &ProviderKind) -> bool {
        self.keys.contains_key(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_api_key_never_prints() {
        let key = ApiKey::new("sk-live-abcdef123456");
        assert_eq!(format!("{}", key), "***");
        assert_eq!(format!("{:?}", key), "***");
        assert_eq!(key.masked(), "sk-l...");
        assert_eq!(ApiKey::new("short").masked(), "***");
    }

    #[test]
    fn test_explicit_beats_config_beats_env() {
        let mut configured = BTreeMap::new();
        configured.insert("claude".to_string(), "from-config".to_string());
        configured.insert("gemini".to_string(), "gem-config".to_string());
        let env = |var: &str| match var {
            "ANTHROPIC_API_KEY" => Some("from-env".to_string()),
            "OPENAI_API_KEY" => Some("openai-env".to_string()),
            _ => None,
        };

        let creds = Credentials::resolve(
            &ProviderKind::BUILTIN,
            Some((&ProviderKind::Claude, "from-flag")),
            &configured,
            env,
        );
        assert_eq!(creds.get(&ProviderKind::Claude).unwrap().expose(), "from-flag");
        assert_eq!(creds.source(&ProviderKind::Claude), Some(KeySource::CommandLine));
        assert_eq!(creds.get(&ProviderKind::ChatGpt).unwrap().expose(), "openai-env");
        assert_eq!(creds.source(&ProviderKind::ChatGpt), Some(KeySource::Environment));
        assert_eq!(creds.get(&ProviderKind::Gemini).unwrap().expose(), "gem-config");
    }

    #[test]
    fn test_blank_values_are_skipped() {
        let mut configured = BTreeMap::new();
        configured.insert("claude".to_string(), "   ".to_string());
        let creds = Credentials::resolve(
            &[ProviderKind::Claude],
            Some((&ProviderKind::Claude, "")),
            &configured,
            |_| Some(String::new()),
        );
        assert!(!creds.contains(&ProviderKind::Claude), "blank at every level means missing");
    }

    #[test]
    fn test_only_requested_providers_resolved() {
        let creds = Credentials::resolve(&[ProviderKind::Gemini], None, &BTreeMap::new(), |v| {
            Some(format!("{}-value", v))
        });
        assert!(creds.contains(&ProviderKind::Gemini));
        assert!(!creds.contains(&ProviderKind::Claude));
        let none = Credentials::resolve(&[ProviderKind::Gemini], None, &BTreeMap::new(), no_env);
        assert!(!none.contains(&ProviderKind::Gemini));
    }
}
