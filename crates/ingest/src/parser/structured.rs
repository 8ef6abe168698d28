//! Level hints from structured (JSON / logfmt) container output.

use crate::record::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Json,
    Logfmt,
    Plain,
}

const LEVEL_KEYS: &[&str] = &["level", "lvl", "severity", "loglevel"];

/// Byte-level layout sniff: `{…}` is JSON, two or more `key=` pairs is logfmt.
pub fn detect_layout(line: &[u8]) -> Layout {
    let trimmed = line.trim_ascii();
    if trimmed.starts_with(b"{") && trimmed.ends_with(b"}") {
        return Layout::Json;
    }
    // The byte before '=' must be a word byte, so `>=`, `==` and URL queries
    // don't count.
    let pairs = trimmed
        .windows(2)
        .filter(|w| (w[0].is_ascii_alphanumeric() || w[0] == b'_') && w[1] == b'=')
        .count();
    if pairs >= 2 {
        Layout::Logfmt
    } else {
        Layout::Plain
    }
}

/// Severity declared by the line itself, when it declares one.
pub fn level_hint(line: &str) -> Option<Severity> {
    match detect_layout(line.as_bytes()) {
        Layout::Json => json_level(line),
        Layout::Logfmt => logfmt_level(line),
        Layout::Plain => None,
    }
}

fn json_level(line: &str) -> Option<Severity> {
    let value: serde_json::Value = serde_json::from_str(line.trim()).ok()?;
    let obj = value.as_object()?;
    LEVEL_KEYS
        .iter()
        .find_map(|k| obj.get(*k))
        .and_then(|v| match v {
            serde_json::Value::String(s) => map_level(s),
            // bunyan/pino numeric levels
            serde_json::Value::Number(n) => n.as_u64().and_then(numeric_level),
            _ => None,
        })
}

fn logfmt_level(line: &str) -> Option<Severity> {
    line.split_whitespace().find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if LEVEL_KEYS.contains(&key) {
            map_level(value.trim_matches('"'))
        } else {
            None
        }
    })
}

fn map_level(level: &str) -> Option<Severity> {
    match level.to_ascii_lowercase().as_str() {
        "error" | "err" | "fatal" | "critical" | "crit" | "panic" | "alert" | "emerg" => {
            Some(Severity::Error)
        }
        "warn" | "warning" => Some(Severity::Warning),
        "info" | "notice" | "debug" | "trace" => Some(Severity::Info),
        _ => None,
    }
}

fn numeric_level(n: u64) -> Option<Severity> {
    match n {
        50.. => Some(Severity::Error),
        40..=49 => Some(Severity::Warning),
        10..=39 => Some(Severity::Info),
        _ => None,
    }
}
