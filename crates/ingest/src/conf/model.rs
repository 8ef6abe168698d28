//! Model: ingestion configuration handed to each component at construction.

use serde::{Deserialize, Serialize};

pub const DEFAULT_DOCKER_SOCKET: &str = "/var/run/docker.sock";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub docker: DockerSourceConfig,
    pub ssh: SshConfig,
    pub normalizer: NormalizerConfig,
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerSourceConfig {
    /// Socket path; `unix://` prefix accepted, empty means bollard defaults.
    pub socket: String,
    pub excluded_containers: Vec<String>,
    /// `tail` passed to the daemon per container.
    pub max_log_lines: u32,
    pub include_stats: bool,
    /// Per-container cap on a single logs/stats call.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub connect_timeout_secs: u64,
    /// Value for `-o StrictHostKeyChecking=`.
    pub strict_host_key_checking: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Appended after the baseline volatile rules.
    pub extra_volatile: Vec<VolatileRuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatileRuleConfig {
    pub pattern: String,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub exclude_patterns: Vec<String>,
    /// Drop health-check and polling noise.
    pub builtin_noise: bool,
    /// Summary mode cutoff per severity; `None` keeps every group.
    pub summary_top_n: Option<usize>,
}

impl Default for DockerSourceConfig {
    fn default() -> Self {
        Self {
            socket: DEFAULT_DOCKER_SOCKET.to_string(),
            excluded_containers: Vec::new(),
            max_log_lines: 1000,
            include_stats: true,
            request_timeout_secs: 30,
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            strict_host_key_checking: "accept-new".to_string(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: Vec::new(),
            builtin_noise: true,
            summary_top_n: None,
        }
    }
}

impl DockerSourceConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_log_lines == 0 {
            return Err("docker.max_log_lines must be > 0".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("docker.request_timeout_secs must be > 0".to_string());
        }
        Ok(())
    }
}

impl SshConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.connect_timeout_secs == 0 {
            return Err("ssh.connect_timeout_secs must be > 0".to_string());
        }
        match self.strict_host_key_checking.as_str() {
            "yes" | "no" | "accept-new" | "ask" | "off" => Ok(()),
            other => Err(format!("ssh.strict_host_key_checking: unsupported value '{}'", other)),
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.summary_top_n == Some(0) {
            return Err("filter.summary_top_n must be > 0 when set".to_string());
        }
        if self.exclude_patterns.iter().any(|p| p.trim().is_empty()) {
            return Err("filter.exclude_patterns must not contain empty patterns".to_string());
        }
        Ok(())
    }
}

impl IngestConfig {
    /// Every problem, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let problems: Vec<String> = [
            self.docker.validate(),
            self.ssh.validate(),
            self.filter.validate(),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}
