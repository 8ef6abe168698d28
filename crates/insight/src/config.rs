use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ingest::conf::{DockerSourceConfig, FilterConfig, IngestConfig, NormalizerConfig, SshConfig};
use serde::{Deserialize, Serialize};

use crate::analysis::{PromptBuilder, RetryPolicy};
use crate::provider::credentials::Credentials;
use crate::provider::{ApiKey, ProviderKind};

pub const ENV_PREFIX: &str = "INSIGHT";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Provider name to API key.
    pub api_keys: BTreeMap<String, String>,
    pub providers: ProvidersConfig,
    pub analysis: AnalysisConfig,
    pub docker: DockerSourceConfig,
    pub ssh: SshConfig,
    pub filter: FilterConfig,
    pub normalizer: NormalizerConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub claude: ProviderSettings,
    pub chatgpt: ProviderSettings,
    pub gemini: ProviderSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderSettings {
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Backend-specific prompt limit, checked before sending.
    #[serde(default)]
    pub max_prompt_bytes: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub max_prompt_bytes: usize,
    pub max_examples: usize,
    pub retry_backoff_ms: u64,
    /// Whole-run deadline; 0 means none.
    pub run_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub color: bool,
    /// Print messages untruncated.
    pub full: bool,
}

impl ProviderSettings {
    pub fn claude() -> Self {
        Self {
            model: "claude-3-opus-20240229".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 4096,
            timeout_secs: 120,
            max_prompt_bytes: None,
        }
    }

    pub fn chatgpt() -> Self {
        Self {
            model: "gpt-4-1106-preview".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 4096,
            timeout_secs: 120,
            max_prompt_bytes: None,
        }
    }

    pub fn gemini() -> Self {
        Self {
            model: "gemini-pro".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            max_tokens: 4096,
            timeout_secs: 120,
            max_prompt_bytes: None,
        }
    }

    fn validate(&self, name: &str, problems: &mut Vec<String>) {
        if self.model.trim().is_empty() {
            problems.push(format!("providers.{}.model must not be empty", name));
        }
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            problems.push(format!("providers.{}.base_url must be an http(s) URL", name));
        }
        if self.max_tokens == 0 {
            problems.push(format!("providers.{}.max_tokens must be > 0", name));
        }
        if self.timeout_secs == 0 {
            problems.push(format!("providers.{}.timeout_secs must be > 0", name));
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            claude: ProviderSettings::claude(),
            chatgpt: ProviderSettings::chatgpt(),
            gemini: ProviderSettings::gemini(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let prompt = PromptBuilder::default();
        Self {
            max_prompt_bytes: prompt.max_bytes,
            max_examples: prompt.max_examples,
            retry_backoff_ms: 1000,
            run_timeout_secs: 300,
        }
    }
}

impl AnalysisConfig {
    pub fn prompt_builder(&self) -> PromptBuilder {
        PromptBuilder::new(self.max_prompt_bytes, self.max_examples)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_backoff(Duration::from_millis(self.retry_backoff_ms))
    }

    /// `None` when the run is unbounded.
    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run_timeout_secs > 0).then(|| Duration::from_secs(self.run_timeout_secs))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "insight=info,ingest=info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true, full: false }
    }
}

/// `~/.config/insight/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("insight").join("config.toml"))
}

impl InsightConfig {
    /// Defaults, then the user config file, then `explicit` (must exist),
    /// then `INSIGHT__SECTION__KEY` environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_layers(user_config_path().as_deref(), explicit, ENV_PREFIX)
    }

    fn load_layers(user: Option<&Path>, explicit: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let defaults = config::Config::try_from(&InsightConfig::default())
            .context("Failed to serialize default configuration")?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = user {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        if let Some(path) = explicit {
            if !path.exists() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn ingest(&self) -> IngestConfig {
        IngestConfig {
            docker: self.docker.clone(),
            ssh: self.ssh.clone(),
            normalizer: self.normalizer.clone(),
            filter: self.filter.clone(),
        }
    }

    /// Every problem, joined into one message.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut problems = self.ingest().validate().err().unwrap_or_default();

        self.providers.claude.validate("claude", &mut problems);
        self.providers.chatgpt.validate("chatgpt", &mut problems);
        self.providers.gemini.validate("gemini", &mut problems);

        if self.analysis.max_prompt_bytes == 0 {
            problems.push("analysis.max_prompt_bytes must be > 0".to_string());
        }
        for name in self.api_keys.keys() {
            if let Err(e) = name.parse::<ProviderKind>() {
                problems.push(format!("api_keys: {}", e));
            }
        }
        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            problems.push(format!("logging.level: invalid filter '{}'", self.logging.level));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }

    /// Effective configuration as pretty JSON with every key masked, plus
    /// where each resolved key came from.
    pub fn show_config(&self, credentials: &Credentials) -> Result<String> {
        let mut masked = self.clone();
        for key in masked.api_keys.values_mut() {
            *key = ApiKey::new(key.as_str()).masked();
        }

        let resolved: BTreeMap<String, String> = ProviderKind::BUILTIN
            .iter()
            .map(|kind| {
                let state = match (credentials.get(kind), credentials.source(kind)) {
                    (Some(key), Some(source)) => format!("{} (from {})", key.masked(), source),
                    _ => "not set".to_string(),
                };
                (kind.to_string(), state)
            })
            .collect();

        let view = serde_json::json!({ "config": masked, "credentials": resolved });
        serde_json::to_string_pretty(&view).context("Failed to render configuration")
    }
}
