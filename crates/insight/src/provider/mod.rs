//! Provider clients: one bounded text completion per call against an AI
//! backend, with failures mapped onto the shared [`ErrorKind`] taxonomy.
//!
//! [`ErrorKind`]: ingest::error::ErrorKind

pub mod chatgpt;
pub mod claude;
pub mod credentials;
pub mod error;
pub mod fake;
pub mod gemini;
pub mod http;
pub mod registry;

use std::fmt;
use std::str::FromStr;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

pub use credentials::{ApiKey, Credentials};
pub use error::ProviderError;
pub use registry::ProviderRegistry;

/// Which backend a request goes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ProviderKind {
    Claude,
    ChatGpt,
    Gemini,
    /// Registered at runtime; the name is stored lowercase.
    Custom(String),
}

impl ProviderKind {
    /// The built-ins in `--compare` order.
    pub const BUILTIN: [ProviderKind; 3] = [ProviderKind::Claude, ProviderKind::ChatGpt, ProviderKind::Gemini];

    pub fn as_str(&self) -> &str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::ChatGpt => "chatgpt",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Custom(name) => name,
        }
    }

    /// Well-known environment variable holding this provider's key.
    pub fn env_var(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Claude => Some("ANTHROPIC_API_KEY"),
            ProviderKind::ChatGpt => Some("OPENAI_API_KEY"),
            ProviderKind::Gemini => Some("GOOGLE_API_KEY"),
            ProviderKind::Custom(_) => None,
        }
    }

    /// Human label for reports.
    pub fn display_name(&self) -> &str {
        match self {
            ProviderKind::Claude => "Claude",
            ProviderKind::ChatGpt => "ChatGPT",
            ProviderKind::Gemini => "Gemini",
            ProviderKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        match name.as_str() {
            "" => Err("provider name must not be empty".to_string()),
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "chatgpt" | "openai" | "gpt" => Ok(ProviderKind::ChatGpt),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            _ if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') => {
                Ok(ProviderKind::Custom(name))
            }
            _ => Err(format!("invalid provider name '{}'", s)),
        }
    }
}

impl From<ProviderKind> for String {
    fn from(kind: ProviderKind) -> Self {
        kind.as_str().to_string()
    }
}

impl TryFrom<String> for ProviderKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The prompt shared by every provider in one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    /// Instructions sent as the system message.
    pub system: String,
    /// Log digest sent as the user message.
    pub user: String,
    pub groups_included: usize,
    /// Oldest groups dropped to fit the size ceiling.
    pub truncated_groups: usize,
}

impl Prompt {
    pub fn len_bytes(&self) -> usize {
        self.system.len() + self.user.len()
    }
}

/// One AI backend.
///
/// Implementations must be `Send + Sync`; one client serves every request
/// of a run and calls may overlap.
pub trait ProviderClient: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Largest prompt this backend accepts, if it has its own limit.
    fn max_prompt_bytes(&self) -> Option<usize> {
        None
    }

    /// One completion attempt. No retries here; see `analysis::submit`.
    fn complete<'a>(&'a self, prompt: &'a Prompt, key: &'a ApiKey) -> BoxFuture<'a, Result<String, ProviderError>>;
}
