//! Fake: test double for Docker operations.
//!
//! Provides a deterministic [`FakeDocker`] that implements [`DockerOps`]
//! using in-memory state, so the Docker source can be exercised without a
//! running daemon.

use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::client::docker::DockerOps;
use crate::docker::client::DockerError;
use crate::docker::inventory::ContainerInfo;
use crate::docker::stats::ContainerStats;
use crate::docker::stream::{LogLine, LogLineStream, LogRequest, StreamKind};

// ── In-memory state ─────────────────────────────────────────────

/// A canned container for the fake store.
#[derive(Clone, Debug)]
pub struct FakeContainer {
    pub info: ContainerInfo,
    pub logs: Vec<FakeLogLine>,
    pub stats: Option<ContainerStats>,
    /// When set, `fetch_logs` fails with `ConnectionFailed(reason)`.
    pub fail_logs: Option<String>,
    /// Yield this error after all canned lines.
    pub fail_mid_stream: Option<String>,
    /// `fetch_logs` answers, but the first stream item is `ContainerNotFound`,
    /// the way the live daemon reports a container removed after listing.
    pub vanished: bool,
    /// Delay before `fetch_logs` answers.
    pub delay: Option<Duration>,
}

/// A canned log line for the fake store.
#[derive(Clone, Debug)]
pub struct FakeLogLine {
    pub timestamp: DateTime<Utc>,
    pub stream: StreamKind,
    pub content: String,
}

impl FakeLogLine {
    pub fn stdout(timestamp: DateTime<Utc>, content: impl Into<String>) -> Self {
        Self { timestamp, stream: StreamKind::Stdout, content: content.into() }
    }
}

impl FakeContainer {
    pub fn running(name: &str) -> Self {
        Self {
            info: ContainerInfo {
                id: format!("{:0<64}", name.bytes().map(|b| format!("{:02x}", b)).collect::<String>()),
                name: name.to_string(),
                image: format!("{}:latest", name),
                state: "running".into(),
                status: "Up 1 hour".into(),
                labels: HashMap::new(),
            },
            logs: Vec::new(),
            stats: None,
            fail_logs: None,
            fail_mid_stream: None,
            vanished: false,
            delay: None,
        }
    }

    pub fn with_logs(mut self, logs: Vec<FakeLogLine>) -> Self {
        self.logs = logs;
        self
    }

    pub fn with_stats(mut self, stats: ContainerStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn failing(mut self, reason: &str) -> Self {
        self.fail_logs = Some(reason.to_string());
        self
    }

    pub fn failing_mid_stream(mut self, reason: &str) -> Self {
        self.fail_mid_stream = Some(reason.to_string());
        self
    }

    pub fn vanished(mut self) -> Self {
        self.vanished = true;
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Default)]
struct Inner {
    /// Insertion order is listing order.
    containers: Vec<FakeContainer>,
    list_error: Option<String>,
    log_requests: Vec<LogRequest>,
}

/// A fake Docker client for deterministic testing.
pub struct FakeDocker {
    inner: Mutex<Inner>,
}

impl FakeDocker {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }

    pub async fn add_container(&self, container: FakeContainer) {
        self.inner.lock().await.containers.push(container);
    }

    /// Make `list_running` fail as if the socket were unreachable.
    pub async fn fail_listing(&self, reason: &str) {
        self.inner.lock().await.list_error = Some(reason.to_string());
    }

    /// Every `fetch_logs` request seen so far.
    pub async fn log_requests(&self) -> Vec<LogRequest> {
        self.inner.lock().await.log_requests.clone()
    }
}

impl Default for FakeDocker {
    fn default() -> Self {
        Self::new()
    }
}

// ── DockerOps implementation ────────────────────────────────────

impl DockerOps for FakeDocker {
    fn list_running(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<ContainerInfo>, DockerError>> + Send + '_>> {
        Box::pin(async move {
            let state = self.inner.lock().await;
            if let Some(reason) = &state.list_error {
                return Err(DockerError::ConnectionFailed(reason.clone()));
            }
            Ok(state
                .containers
                .iter()
                .filter(|c| c.info.state == "running")
                .map(|c| c.info.clone())
                .collect())
        })
    }

    fn fetch_logs(
        &self,
        request: LogRequest,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<LogLineStream, DockerError>> + Send + '_>> {
        Box::pin(async move {
            let container = {
                let mut state = self.inner.lock().await;
                state.log_requests.push(request.clone());
                state
                    .containers
                    .iter()
                    .find(|c| c.info.matches(&request.container))
                    .cloned()
                    .ok_or_else(|| DockerError::ContainerNotFound(request.container.clone()))?
            };

            if let Some(delay) = container.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(reason) = container.fail_logs {
                return Err(DockerError::ConnectionFailed(reason));
            }
            if container.vanished {
                let gone: LogLineStream = Box::pin(tokio_stream::iter(vec![Err(
                    DockerError::ContainerNotFound(container.info.name.clone()),
                )]));
                return Ok(gone);
            }

            let in_range: Vec<&FakeLogLine> = container
                .logs
                .iter()
                .filter(|l| {
                    let secs = l.timestamp.timestamp();
                    secs >= request.since && (request.until == 0 || secs < request.until)
                })
                .collect();
            let skip = request
                .tail
                .map(|t| in_range.len().saturating_sub(t as usize))
                .unwrap_or(0);

            let mut items: Vec<Result<LogLine, DockerError>> = in_range
                .into_iter()
                .skip(skip)
                .map(|l| {
                    Ok(LogLine {
                        timestamp: Some(l.timestamp),
                        stream: l.stream,
                        content: Bytes::from(l.content.clone()),
                    })
                })
                .collect();
            if let Some(reason) = container.fail_mid_stream {
                items.push(Err(DockerError::StreamClosed(reason)));
            }

            let stream: LogLineStream = Box::pin(tokio_stream::iter(items));
            Ok(stream)
        })
    }

    fn stats_snapshot<'a>(
        &'a self,
        container: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ContainerStats, DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let state = self.inner.lock().await;
            let found = state
                .containers
                .iter()
                .find(|c| c.info.matches(container))
                .ok_or_else(|| DockerError::ContainerNotFound(container.to_string()))?;
            found
                .stats
                .clone()
                .ok_or_else(|| DockerError::StreamClosed(format!("no stats sample for {}", container)))
        })
    }
}
