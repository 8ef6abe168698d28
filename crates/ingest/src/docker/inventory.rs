use std::collections::HashMap;

use bollard::models::ContainerSummary;
use serde::{Deserialize, Serialize};

/// Container identity as reported by Docker's list API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerInfo {
    pub id: String,
    /// Without the leading slash.
    pub name: String,
    pub image: String,
    /// "running", "paused", "exited", …
    pub state: String,
    /// "Up 2 hours"
    pub status: String,
    pub labels: HashMap<String, String>,
}

impl ContainerInfo {
    /// Matches a user-supplied container reference by name or id prefix.
    pub fn matches(&self, reference: &str) -> bool {
        let reference = reference.trim_start_matches('/');
        self.name == reference || (reference.len() >= 12 && self.id.starts_with(reference))
    }

    pub fn short_id(&self) -> &str {
        self.id.get(..12).unwrap_or(&self.id)
    }
}

impl From<ContainerSummary> for ContainerInfo {
    fn from(s: ContainerSummary) -> Self {
        let id = s.id.unwrap_or_default();
        let name = s
            .names
            .as_deref()
            .and_then(|n| n.first())
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_else(|| id.chars().take(12).collect());

        Self {
            id,
            name,
            image: s.image.unwrap_or_default(),
            state: s
                .state
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".into()),
            status: s.status.unwrap_or_default(),
            labels: s.labels.unwrap_or_default(),
        }
    }
}

/// One line of `docker ps --no-trunc --format '{{json .}}'`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    /// Comma-separated, no leading slash.
    names: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    status: String,
    /// `k=v,k2=v2`
    #[serde(default)]
    labels: String,
}

impl ContainerInfo {
    /// Parse one JSON line of the `docker ps` CLI.
    pub fn from_cli_json(line: &str) -> Result<Self, serde_json::Error> {
        let ps: PsLine = serde_json::from_str(line)?;
        let name = ps
            .names
            .split(',')
            .map(str::trim)
            .find(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| ps.id.chars().take(12).collect());
        let labels = ps
            .labels
            .split(',')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.to_string()))
            .collect();
        Ok(Self {
            id: ps.id,
            name,
            image: ps.image,
            // `docker ps` without `-a` only lists running containers; older
            // CLIs omit the State column.
            state: if ps.state.is_empty() { "running".into() } else { ps.state },
            status: ps.status,
            labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: &str, name: &str) -> ContainerInfo {
        ContainerInfo {
            id: id.into(),
            name: name.into(),
            image: "nginx:latest".into(),
            state: "running".into(),
            status: "Up 1 hour".into(),
            labels: HashMap::new(),
        }
    }

    #[test]
    fn test_from_summary_trims_slash() {
        let summary = ContainerSummary {
            id: Some("abcdef0123456789".into()),
            names: Some(vec!["/web".into()]),
            image: Some("nginx".into()),
            ..Default::default()
        };
        let c = ContainerInfo::from(summary);
        assert_eq!(c.name, "web");
        assert_eq!(c.state, "unknown", "missing state falls back");
    }

    #[test]
    fn test_from_summary_without_names_uses_short_id() {
        let summary = ContainerSummary {
            id: Some("abcdef0123456789".into()),
            ..Default::default()
        };
        assert_eq!(ContainerInfo::from(summary).name, "abcdef012345");
    }

    #[test]
    fn test_matches_name_or_id_prefix() {
        let c = info("4f9a1b2c3d5e6f708192", "api");
        assert!(c.matches("api"));
        assert!(c.matches("/api"));
        assert!(c.matches("4f9a1b2c3d5e"));
        assert!(!c.matches("4f9a"), "short prefixes are ambiguous");
        assert!(!c.matches("web"));
    }

    #[test]
    fn test_short_id() {
        assert_eq!(info("4f9a1b2c3d5e6f708192", "api").short_id(), "4f9a1b2c3d5e");
        assert_eq!(info("abc", "x").short_id(), "abc");
    }

    #[test]
    fn test_from_cli_json() {
        let line = r#"{"Command":"\"nginx -g\"","ID":"4f9a1b2c3d5e6f708192","Image":"nginx:1.25","Labels":"com.docker.compose.service=web,tier=front","Names":"web","State":"running","Status":"Up 3 hours"}"#;
        let c = ContainerInfo::from_cli_json(line).unwrap();
        assert_eq!(c.id, "4f9a1b2c3d5e6f708192");
        assert_eq!(c.name, "web");
        assert_eq!(c.image, "nginx:1.25");
        assert_eq!(c.status, "Up 3 hours");
        assert_eq!(c.labels.get("tier").map(String::as_str), Some("front"));
        assert_eq!(c.labels.len(), 2);
    }

    #[test]
    fn test_from_cli_json_old_cli_without_state() {
        let line = r#"{"ID":"abcdef0123456789","Names":"","Labels":""}"#;
        let c = ContainerInfo::from_cli_json(line).unwrap();
        assert_eq!(c.name, "abcdef012345", "no names falls back to the short id");
        assert_eq!(c.state, "running");
        assert!(c.labels.is_empty());
    }

    #[test]
    fn test_from_cli_json_rejects_garbage() {
        assert!(ContainerInfo::from_cli_json("CONTAINER ID   IMAGE").is_err());
    }
}
