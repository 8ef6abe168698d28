//! Source adapters: produce raw lines for a time window from one origin
//! (local journal, remote journal over SSH, Docker containers).
//!
//! Every adapter returns a lazy [`RawLineStream`]. Dropping the stream
//! releases the process or connection behind it.

pub mod command;
pub mod docker;
pub mod local;
pub mod remote;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_stream::Stream;

use crate::deadline::{Cancelled, Deadline};
use crate::docker::stats::ContainerStats;
use crate::error::ErrorKind;
use crate::record::{RawLine, SourceTag, Window};

pub use docker::DockerSource;
pub use local::LocalJournal;
pub use remote::{RemoteJournal, SshCredential, SshTarget};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{source_id}: source unavailable: {reason}")]
    Unavailable { source_id: String, reason: String },
    #[error("{source_id}: connection failed: {reason}")]
    Connection { source_id: String, reason: String },
    #[error("{source_id}: stream interrupted: {reason}")]
    Interrupted { source_id: String, reason: String },
    #[error("{source_id}: {reason}")]
    Cancelled { source_id: String, reason: Cancelled },
}

impl SourceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SourceError::Unavailable { .. } => ErrorKind::SourceUnavailable,
            SourceError::Connection { .. } => ErrorKind::ConnectionError,
            SourceError::Interrupted { .. } => ErrorKind::PartialSourceFailure,
            SourceError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            SourceError::Unavailable { source_id, .. }
            | SourceError::Connection { source_id, .. }
            | SourceError::Interrupted { source_id, .. }
            | SourceError::Cancelled { source_id, .. } => source_id,
        }
    }
}

/// A non-fatal problem reported alongside whatever a source did produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceWarning {
    pub source: SourceTag,
    pub kind: ErrorKind,
    pub message: String,
}

impl SourceWarning {
    pub fn new(source: SourceTag, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { source, kind, message: message.into() }
    }
}

pub type RawLineStream = Pin<Box<dyn Stream<Item = Result<RawLine, SourceError>> + Send>>;

/// What one successful `fetch` yields.
pub struct SourceFetch {
    pub lines: RawLineStream,
    pub warnings: Vec<SourceWarning>,
    pub container_stats: Vec<ContainerStats>,
}

impl SourceFetch {
    pub fn lines(lines: RawLineStream) -> Self {
        Self { lines, warnings: Vec::new(), container_stats: Vec::new() }
    }
}

/// Caller-supplied narrowing applied by adapters that understand it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchHints {
    /// Docker only: restrict to this container (name or id prefix).
    pub container: Option<String>,
    /// Upper bound on lines per stream where the origin supports it.
    pub tail_lines: Option<u32>,
}

/// One origin of raw log lines.
///
/// Object-safe thanks to `Pin<Box<…>>` returns so the collector can hold a
/// heterogeneous `Vec<Box<dyn LogSource>>`.
pub trait LogSource: Send + Sync {
    /// Display name used in warnings and tracing spans.
    fn name(&self) -> String;

    /// Tag stamped on every line this source yields.
    fn tag(&self) -> SourceTag;

    fn fetch<'a>(
        &'a self,
        window: Window,
        hints: &'a FetchHints,
        deadline: &'a Deadline,
    ) -> Pin<Box<dyn Future<Output = Result<SourceFetch, SourceError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let id = || "web".to_string();
        assert_eq!(
            SourceError::Unavailable { source_id: id(), reason: "x".into() }.kind(),
            ErrorKind::SourceUnavailable
        );
        assert_eq!(
            SourceError::Connection { source_id: id(), reason: "x".into() }.kind(),
            ErrorKind::ConnectionError
        );
        assert_eq!(
            SourceError::Interrupted { source_id: id(), reason: "x".into() }.kind(),
            ErrorKind::PartialSourceFailure
        );
        assert_eq!(
            SourceError::Cancelled { source_id: id(), reason: Cancelled::Expired }.kind(),
            ErrorKind::Cancelled
        );
    }

    #[test]
    fn test_error_display_names_source() {
        let err = SourceError::Connection { source_id: "db-1".into(), reason: "timed out".into() };
        assert_eq!(err.to_string(), "db-1: connection failed: timed out");
        assert_eq!(err.source_id(), "db-1");
    }

    #[test]
    fn test_warning_serializes_kind_snake_case() {
        let w = SourceWarning::new(SourceTag::docker("api"), ErrorKind::PartialSourceFailure, "gone");
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "partial_source_failure");
        assert_eq!(json["source"]["id"], "api");
    }
}
