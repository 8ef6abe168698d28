//! Optional context appended to the prompt: user-supplied system info and
//! container resource snapshots.

use std::path::Path;

use ingest::docker::ContainerStats;
use ingest::record::Window;
use serde_json::{json, Map, Value};

use super::AnalysisError;

#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    pub window: Option<Window>,
    pub system_info: Option<Value>,
    pub container_stats: Vec<ContainerStats>,
}

impl AnalysisContext {
    pub fn new(window: Window) -> Self {
        Self { window: Some(window), ..Default::default() }
    }

    pub fn with_system_info(mut self, info: Value) -> Self {
        self.system_info = Some(info);
        self
    }

    pub fn with_container_stats(mut self, stats: Vec<ContainerStats>) -> Self {
        self.container_stats = stats;
        self
    }

    /// System info with container stats merged under `"docker"`. A
    /// non-object system info is nested under `"system"` first.
    pub fn merged(&self) -> Option<Value> {
        let mut merged = match &self.system_info {
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                let mut map = Map::new();
                map.insert("system".to_string(), other.clone());
                map
            }
            None if self.container_stats.is_empty() => return None,
            None => Map::new(),
        };
        if !self.container_stats.is_empty() {
            merged.insert("docker".to_string(), json!({ "containers": self.container_stats }));
        }
        Some(Value::Object(merged))
    }
}

/// Read a `--system-info` JSON file.
pub fn load_system_info(path: &Path) -> Result<Value, AnalysisError> {
    let content = std::fs::read_to_string(path).map_err(|e| AnalysisError::SystemInfo {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| AnalysisError::SystemInfo {
        path: path.to_path_buf(),
        reason: format!("invalid JSON: {}", e),
    })
}
