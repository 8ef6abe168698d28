//! Docker source: bounded log fetch across running containers.
//!
//! Containers are opened concurrently. A container that fails becomes a
//! `PartialSourceFailure` warning; the source only fails as a whole when
//! the daemon is unreachable, a named container does not exist, or every
//! container failed.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{self, join_all};
use futures_util::stream::{self, StreamExt};

use crate::client::DockerOps;
use crate::conf::DockerSourceConfig;
use crate::deadline::Deadline;
use crate::docker::client::DockerError;
use crate::docker::inventory::ContainerInfo;
use crate::docker::stats::ContainerStats;
use crate::docker::stream::{LogLine, LogLineStream, LogRequest};
use crate::error::ErrorKind;
use crate::record::{LineFormat, RawLine, SourceTag, Window};
use crate::source::{FetchHints, LogSource, RawLineStream, SourceError, SourceFetch, SourceWarning};

pub struct DockerSource {
    ops: Arc<dyn DockerOps>,
    config: DockerSourceConfig,
    /// Set when the daemon is reached through a remote host.
    host: Option<String>,
}

impl DockerSource {
    pub fn new(ops: Arc<dyn DockerOps>, config: DockerSourceConfig) -> Self {
        Self { ops, config, host: None }
    }

    /// Name the source after the remote host instead of the socket.
    pub fn on_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    fn daemon_id(&self) -> String {
        if let Some(host) = &self.host {
            host.clone()
        } else if self.config.socket.is_empty() {
            "docker".to_string()
        } else {
            self.config.socket.clone()
        }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    fn unavailable(&self, reason: impl Into<String>) -> SourceError {
        SourceError::Unavailable { source_id: self.daemon_id(), reason: reason.into() }
    }

    /// Named container, or every running container not excluded by config.
    fn select(
        &self,
        running: Vec<ContainerInfo>,
        hints: &FetchHints,
    ) -> Result<Vec<ContainerInfo>, SourceError> {
        match &hints.container {
            Some(reference) => running
                .into_iter()
                .find(|c| c.matches(reference))
                .map(|c| vec![c])
                .ok_or_else(|| self.unavailable(format!("container not found: {}", reference))),
            None => Ok(running
                .into_iter()
                .filter(|c| {
                    !self
                        .config
                        .excluded_containers
                        .iter()
                        .any(|excluded| c.matches(excluded))
                })
                .collect()),
        }
    }

    /// Opens the container's log stream and waits for its first item. Log
    /// calls are lazy, so a vanished container or a dropped connection only
    /// shows up on the first read; it fails the container here instead of
    /// surfacing as a mid-stream interruption.
    async fn open_logs(
        &self,
        container: &ContainerInfo,
        window: &Window,
        tail: u32,
    ) -> Result<LogLineStream, DockerError> {
        let request = LogRequest {
            container: container.name.clone(),
            since: window.start.timestamp(),
            // The daemon's bound is whole seconds; the normalizer enforces the
            // exclusive end.
            until: window.end.timestamp() + 1,
            tail: Some(tail),
        };
        let open = async {
            let mut lines = self.ops.fetch_logs(request).await?;
            match lines.next().await {
                Some(Err(e)) => Err(e),
                Some(Ok(first)) => {
                    let lines: LogLineStream = Box::pin(stream::once(future::ready(Ok(first))).chain(lines));
                    Ok(lines)
                }
                None => {
                    let lines: LogLineStream = Box::pin(stream::empty::<Result<LogLine, DockerError>>());
                    Ok(lines)
                }
            }
        };
        tokio::time::timeout(self.request_timeout(), open)
            .await
            .map_err(|_| DockerError::Timeout(format!("logs for {}", container.name)))?
    }

    async fn snapshot(&self, container: &ContainerInfo) -> Option<ContainerStats> {
        let result = tokio::time::timeout(
            self.request_timeout(),
            self.ops.stats_snapshot(&container.name),
        )
        .await;
        match result {
            Ok(Ok(stats)) => Some(stats),
            Ok(Err(e)) => {
                tracing::warn!(container = %container.name, error = %e, "stats snapshot failed");
                None
            }
            Err(_) => {
                tracing::warn!(container = %container.name, "stats snapshot timed out");
                None
            }
        }
    }

    async fn fetch_inner(
        &self,
        window: Window,
        hints: &FetchHints,
    ) -> Result<SourceFetch, SourceError> {
        let running = tokio::time::timeout(self.request_timeout(), self.ops.list_running())
            .await
            .map_err(|_| self.unavailable("listing containers timed out"))?
            .map_err(|e| self.unavailable(e.to_string()))?;

        let selected = self.select(running, hints)?;
        if selected.is_empty() {
            tracing::info!("no running containers to read");
            return Ok(SourceFetch::lines(Box::pin(stream::empty::<Result<RawLine, SourceError>>())));
        }

        let tail = hints.tail_lines.unwrap_or(self.config.max_log_lines);
        let opened = join_all(selected.iter().map(|c| self.open_logs(c, &window, tail))).await;

        let mut streams = Vec::new();
        let mut warnings = Vec::new();
        let mut healthy = Vec::new();
        for (container, result) in selected.iter().zip(opened) {
            match result {
                Ok(lines) => {
                    tracing::debug!(container = %container.name, "log stream opened");
                    streams.push(container_lines(container.name.clone(), lines));
                    healthy.push(container);
                }
                Err(e) => {
                    tracing::warn!(container = %container.name, error = %e, "container log fetch failed");
                    warnings.push(SourceWarning::new(
                        SourceTag::docker(container.name.clone()),
                        ErrorKind::PartialSourceFailure,
                        e.to_string(),
                    ));
                }
            }
        }

        if streams.is_empty() {
            let reasons: Vec<&str> = warnings.iter().map(|w| w.message.as_str()).collect();
            return Err(self.unavailable(format!(
                "all {} container(s) failed: {}",
                selected.len(),
                reasons.join("; ")
            )));
        }

        let container_stats = if self.config.include_stats {
            join_all(healthy.iter().map(|c| self.snapshot(c)))
                .await
                .into_iter()
                .flatten()
                .collect()
        } else {
            Vec::new()
        };

        Ok(SourceFetch {
            lines: Box::pin(stream::select_all(streams)),
            warnings,
            container_stats,
        })
    }
}

/// One raw line per `\n`-separated chunk of a frame; TTY frames can carry
/// several lines.
fn split_frame(origin: &SourceTag, line: LogLine) -> Vec<RawLine> {
    let LogLine { timestamp, content, .. } = line;
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, byte) in content.iter().enumerate() {
        if *byte == b'\n' {
            if idx > start {
                out.push(content.slice(start..idx));
            }
            start = idx + 1;
        }
    }
    if start < content.len() {
        out.push(content.slice(start..));
    }
    out.into_iter()
        .map(|chunk| {
            let raw = RawLine::new(origin.clone(), LineFormat::Docker, chunk);
            match timestamp {
                Some(ts) => raw.with_timestamp(ts),
                None => raw,
            }
        })
        .collect()
}

fn container_lines(name: String, lines: LogLineStream) -> RawLineStream {
    let origin = SourceTag::docker(name.clone());
    let stream = lines.flat_map(move |item| {
        let items: Vec<Result<RawLine, SourceError>> = match item {
            Ok(line) => split_frame(&origin, line).into_iter().map(Ok).collect(),
            Err(e) => vec![Err(SourceError::Interrupted {
                source_id: name.clone(),
                reason: e.to_string(),
            })],
        };
        stream::iter(items)
    });
    Box::pin(stream)
}

impl LogSource for DockerSource {
    fn name(&self) -> String {
        format!("docker ({})", self.daemon_id())
    }

    fn tag(&self) -> SourceTag {
        SourceTag::docker(self.daemon_id())
    }

    fn fetch<'a>(
        &'a self,
        window: Window,
        hints: &'a FetchHints,
        deadline: &'a Deadline,
    ) -> Pin<Box<dyn Future<Output = Result<SourceFetch, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            deadline
                .run(self.fetch_inner(window, hints))
                .await
                .map_err(|reason| SourceError::Cancelled { source_id: self.daemon_id(), reason })?
        })
    }
}
