use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Log severity. Ordered most severe first so sorted output leads with errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Unknown,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Error,
        Severity::Warning,
        Severity::Info,
        Severity::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" | "errors" | "err" => Ok(Severity::Error),
            "warning" | "warnings" | "warn" => Ok(Severity::Warning),
            "info" | "information" => Ok(Severity::Info),
            "unknown" => Ok(Severity::Unknown),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "remote-host")]
    Remote,
    #[serde(rename = "docker-container")]
    Docker,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Local => "local",
            SourceKind::Remote => "remote-host",
            SourceKind::Docker => "docker-container",
        })
    }
}

/// Source kind plus identifier (hostname or container name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceTag {
    pub kind: SourceKind,
    pub id: String,
}

impl SourceTag {
    pub fn local(host: impl Into<String>) -> Self {
        Self { kind: SourceKind::Local, id: host.into() }
    }

    pub fn remote(host: impl Into<String>) -> Self {
        Self { kind: SourceKind::Remote, id: host.into() }
    }

    pub fn docker(container: impl Into<String>) -> Self {
        Self { kind: SourceKind::Docker, id: container.into() }
    }
}

// Identifier first: group ordering tie-breaks on the source identifier.
impl Ord for SourceTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id).then(self.kind.cmp(&other.kind))
    }
}

impl PartialOrd for SourceTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// One normalized log entry.
///
/// Built by the normalizer with `occurrence_count = 1`; only grouping
/// changes the count afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub source: SourceTag,
    pub severity: Severity,
    pub raw_message: String,
    pub normalized_message: String,
    pub occurrence_count: u32,
    /// Set when the line carried no parsable timestamp.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub timestamp_inferred: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
}

impl Record {
    pub fn new(
        timestamp: DateTime<Utc>,
        source: SourceTag,
        severity: Severity,
        raw_message: impl Into<String>,
        normalized_message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            source,
            severity,
            raw_message: raw_message.into(),
            normalized_message: normalized_message.into(),
            occurrence_count: 1,
            timestamp_inferred: false,
            process: None,
        }
    }
}

/// Line layout hint so the normalizer knows where the timestamp lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat {
    /// `journalctl --output=short-iso`.
    Journal,
    /// macOS `log show --style syslog` or classic BSD syslog.
    Syslog,
    /// Docker log payload; the daemon timestamp is already split off.
    Docker,
}

/// One undecoded line as produced by a source adapter.
#[derive(Debug, Clone)]
pub struct RawLine {
    pub origin: SourceTag,
    pub content: Bytes,
    pub timestamp: Option<DateTime<Utc>>,
    pub format: LineFormat,
}

impl RawLine {
    pub fn new(origin: SourceTag, format: LineFormat, content: impl Into<Bytes>) -> Self {
        Self {
            origin,
            content: content.into(),
            timestamp: None,
            format,
        }
    }

    pub fn with_timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.timestamp = Some(ts);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // ── Severity ────────────────────────────────────────────────

    #[test]
    fn test_severity_parse_aliases() {
        assert_eq!("errors".parse::<Severity>().unwrap(), Severity::Error);
        assert_eq!("WARN".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!(" info ".parse::<Severity>().unwrap(), Severity::Info);
        assert!("debug".parse::<Severity>().is_err());
    }

    #[test]
    fn test_severity_orders_most_severe_first() {
        let mut all = vec![Severity::Unknown, Severity::Info, Severity::Error, Severity::Warning];
        all.sort();
        assert_eq!(all, Severity::ALL.to_vec());
    }

    // ── SourceTag ───────────────────────────────────────────────

    #[test]
    fn test_source_tag_orders_by_identifier() {
        let a = SourceTag::docker("api");
        let b = SourceTag::local("zeta");
        let c = SourceTag::remote("web01");
        let mut tags = vec![b.clone(), c.clone(), a.clone()];
        tags.sort();
        assert_eq!(tags, vec![a, c, b], "identifier ascending regardless of kind");
    }

    #[test]
    fn test_source_kind_serde_names() {
        let tag = SourceTag::remote("db01");
        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(json["kind"], "remote-host");
        assert_eq!(json["id"], "db01");

        let docker = serde_json::to_value(SourceKind::Docker).unwrap();
        assert_eq!(docker, "docker-container");
    }

    // ── Record ──────────────────────────────────────────────────

    #[test]
    fn test_record_json_omits_default_markers() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let record = Record::new(ts, SourceTag::local("host"), Severity::Error, "boom 42", "boom <N>");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["occurrence_count"], 1);
        assert_eq!(json["severity"], "error");
        assert!(json.get("timestamp_inferred").is_none(), "false marker is omitted");
        assert!(json.get("process").is_none());

        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_json_keeps_inferred_marker() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut record = Record::new(ts, SourceTag::docker("web"), Severity::Unknown, "x", "x");
        record.timestamp_inferred = true;
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["timestamp_inferred"], true);
    }
}
