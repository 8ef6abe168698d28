use std::path::PathBuf;

use clap::Parser;
use ingest::filter::SeveritySet;
use ingest::record::Severity;

use crate::config::InsightConfig;
use crate::provider::{ApiKey, ProviderKind};

/// Insight: collect one window of system, remote-host and container logs,
/// condense them into groups, and optionally ask one or more AI providers
/// to analyze them.
///
/// Without `--host` or `--docker` the local journal is read. `--host` and
/// `--docker` together read both.
#[derive(Parser, Debug)]
#[command(name = "insight", version)]
pub struct Cli {
    /// Hours of logs to read, counting back from now.
    #[arg(short = 't', long = "time", value_name = "HOURS", default_value_t = 1.0)]
    pub hours: f64,

    // ── Remote host ──
    /// Read the journal of this host over SSH.
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// SSH user; defaults to ssh's own choice.
    #[arg(long, value_name = "USER", requires = "host")]
    pub user: Option<String>,

    /// SSH port.
    #[arg(long, default_value_t = ingest::source::remote::DEFAULT_SSH_PORT)]
    pub port: u16,

    /// Private key file for SSH.
    #[arg(long, value_name = "PATH", requires = "host", conflicts_with = "password_env")]
    pub key: Option<PathBuf>,

    /// Environment variable holding the SSH password.
    #[arg(long, value_name = "VAR", requires = "host")]
    pub password_env: Option<String>,

    // ── Docker ──
    /// Read container logs: from the local Docker daemon, or with `--host`
    /// from the daemon on that host over SSH.
    #[arg(long)]
    pub docker: bool,

    /// Only this container (name or id prefix).
    #[arg(long, value_name = "NAME", requires = "docker")]
    pub container: Option<String>,

    /// Docker socket path.
    #[arg(long, value_name = "PATH")]
    pub docker_socket: Option<String>,

    /// Skip per-container resource stats.
    #[arg(long)]
    pub no_container_stats: bool,

    // ── Filtering ──
    /// Only error records.
    #[arg(long, conflicts_with_all = ["only_warnings", "only_info", "severity"])]
    pub only_errors: bool,

    /// Only warning records.
    #[arg(long, conflicts_with_all = ["only_info", "severity"])]
    pub only_warnings: bool,

    /// Only info records.
    #[arg(long, conflicts_with = "severity")]
    pub only_info: bool,

    /// Comma-separated severities, e.g. `error,warning`.
    #[arg(long, value_name = "LIST")]
    pub severity: Option<String>,

    /// Drop severity levels: info, warnings, errors. Repeatable or
    /// comma-separated.
    #[arg(
        long,
        value_name = "LEVEL",
        value_delimiter = ',',
        value_parser = ["info", "warnings", "errors"]
    )]
    pub ignore: Vec<String>,

    /// Drop records whose normalized message matches this regex. Repeatable.
    #[arg(long, value_name = "REGEX")]
    pub exclude: Vec<String>,

    /// Keep only the top groups per severity.
    #[arg(long)]
    pub summary: bool,

    /// Groups kept per severity in summary mode; implies `--summary`.
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    // ── Output ──
    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,

    #[arg(long)]
    pub no_color: bool,

    /// Do not truncate long messages.
    #[arg(long)]
    pub full: bool,

    /// Write the report to this file instead of stdout.
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Debug logging on stderr.
    #[arg(long)]
    pub debug: bool,

    // ── Configuration ──
    /// Configuration file (TOML).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the effective configuration with keys masked, then exit.
    #[arg(long)]
    pub show_config: bool,

    // ── Analysis ──
    /// AI provider: claude, chatgpt or gemini. Repeatable; order is kept.
    #[arg(long = "ai", value_name = "PROVIDER")]
    pub ai: Vec<ProviderKind>,

    /// Ask claude, chatgpt and gemini and show the answers side by side.
    #[arg(long)]
    pub compare: bool,

    /// API key for the single requested provider.
    #[arg(long, value_name = "KEY", value_parser = parse_api_key)]
    pub api_key: Option<ApiKey>,

    /// JSON file with extra system context for the prompt.
    #[arg(long, value_name = "FILE")]
    pub system_info: Option<PathBuf>,

    /// Example lines shown per group in the prompt.
    #[arg(long, value_name = "N")]
    pub max_examples: Option<usize>,

    /// Deadline for the whole run, in seconds; 0 means none.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

fn parse_api_key(value: &str) -> Result<ApiKey, String> {
    let key = ApiKey::new(value.trim());
    if key.is_blank() {
        Err("API key must not be empty".to_string())
    } else {
        Ok(key)
    }
}

impl Cli {
    /// The `--only-*`/`--severity` selection minus every `--ignore` level.
    pub fn severities(&self) -> Result<SeveritySet, String> {
        let mut set = if self.only_errors {
            SeveritySet::only([Severity::Error])
        } else if self.only_warnings {
            SeveritySet::only([Severity::Warning])
        } else if self.only_info {
            SeveritySet::only([Severity::Info])
        } else {
            match &self.severity {
                Some(list) => list.parse()?,
                None => SeveritySet::all(),
            }
        };
        for level in &self.ignore {
            set = set.without(level.parse()?);
        }
        if set.is_empty() {
            return Err("every severity is ignored; nothing would be shown".to_string());
        }
        Ok(set)
    }

    /// `--compare` built-ins first, then `--ai` in the order given.
    pub fn providers(&self) -> Vec<ProviderKind> {
        let mut providers = Vec::new();
        if self.compare {
            providers.extend(ProviderKind::BUILTIN);
        }
        for kind in &self.ai {
            if !providers.contains(kind) {
                providers.push(kind.clone());
            }
        }
        providers
    }

    pub fn summary_mode(&self) -> bool {
        self.summary || self.top.is_some()
    }

    pub fn wants_local(&self) -> bool {
        self.host.is_none() && !self.docker
    }

    /// Flags override whatever the config layers produced.
    pub fn apply_overrides(&self, config: &mut InsightConfig) {
        if let Some(socket) = &self.docker_socket {
            config.docker.socket = socket.clone();
        }
        if self.no_container_stats {
            config.docker.include_stats = false;
        }
        if let Some(top) = self.top {
            config.filter.summary_top_n = Some(top);
        }
        if self.no_color {
            config.output.color = false;
        }
        if self.full {
            config.output.full = true;
        }
        if let Some(n) = self.max_examples {
            config.analysis.max_examples = n;
        }
        if let Some(secs) = self.timeout {
            config.analysis.run_timeout_secs = secs;
        }
        if self.debug {
            config.logging.level = "insight=debug,ingest=debug".to_string();
        }
    }
}
