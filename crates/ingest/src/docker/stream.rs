use std::pin::Pin;

use bollard::container::LogOutput;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio_stream::Stream;

use crate::docker::client::DockerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Bounded logs query for one container.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRequest {
    pub container: String,
    /// Unix seconds, inclusive.
    pub since: i64,
    /// Unix seconds; 0 means "now".
    pub until: i64,
    /// Like `docker logs --tail N`; `None` means all.
    pub tail: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct LogLine {
    /// Daemon timestamp; `None` when the prefix was missing or unparsable.
    pub timestamp: Option<DateTime<Utc>>,
    pub stream: StreamKind,
    pub content: Bytes,
}

pub type LogLineStream = Pin<Box<dyn Stream<Item = Result<LogLine, DockerError>> + Send>>;

/// Split the RFC 3339 prefix the daemon adds with `timestamps = true`.
pub(crate) fn convert_bollard_log(output: LogOutput) -> LogLine {
    let (stream, raw) = match output {
        LogOutput::StdErr { message } => (StreamKind::Stderr, message),
        LogOutput::StdOut { message }
        | LogOutput::StdIn { message }
        | LogOutput::Console { message } => (StreamKind::Stdout, message),
    };
    let (timestamp, content) = split_timestamp(raw);
    LogLine { timestamp, stream, content }
}

/// `<rfc3339> <content>` as written by the daemon and by
/// `docker logs --timestamps`. Without a parsable prefix the line is
/// returned whole.
pub(crate) fn split_timestamp(raw: Bytes) -> (Option<DateTime<Utc>>, Bytes) {
    let parsed = raw.iter().position(|&b| b == b' ').and_then(|idx| {
        let prefix = std::str::from_utf8(&raw[..idx]).ok()?;
        let ts = DateTime::parse_from_rfc3339(prefix).ok()?;
        Some((ts.with_timezone(&Utc), idx))
    });
    match parsed {
        Some((ts, idx)) => (Some(ts), raw.slice(idx + 1..)),
        None => (None, raw),
    }
}
