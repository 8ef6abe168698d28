//! Container domain: list running containers, bounded log fetch, one-shot
//! stats.

use bollard::query_parameters::{ListContainersOptions, LogsOptions, StatsOptions};
use futures_util::stream::StreamExt;

use super::client::{DockerClient, DockerError};
use super::inventory::ContainerInfo;
use super::stats::ContainerStats;
use super::stream::{convert_bollard_log, LogLineStream, LogRequest};

/// Bollard 0.20 takes i32 unix seconds for since/until.
fn clamp_secs(secs: i64) -> i32 {
    if secs > i32::MAX as i64 {
        tracing::warn!(secs, "timestamp exceeds i32 range, clamping");
    }
    secs.clamp(0, i32::MAX as i64) as i32
}

impl DockerClient {
    pub async fn list_running_containers(&self) -> Result<Vec<ContainerInfo>, DockerError> {
        // `all: false` → running only
        let options = Some(ListContainersOptions {
            all: false,
            ..Default::default()
        });
        let containers = self
            .client
            .list_containers(options)
            .await
            .map_err(|e| DockerError::classify(e, ""))?;
        Ok(containers.into_iter().map(ContainerInfo::from).collect())
    }

    /// Non-following logs for `[since, until)`, stdout and stderr, with daemon
    /// timestamps.
    pub fn fetch_logs(&self, request: LogRequest) -> LogLineStream {
        let options = LogsOptions {
            follow: false,
            stdout: true,
            stderr: true,
            since: clamp_secs(request.since),
            until: clamp_secs(request.until),
            timestamps: true,
            tail: request
                .tail
                .map(|n| n.to_string())
                .unwrap_or_else(|| "all".to_string()),
        };

        let container = request.container;
        let stream = self
            .client
            .logs(&container, Some(options))
            .map(move |item| match item {
                Ok(output) => Ok(convert_bollard_log(output)),
                Err(e) => Err(DockerError::classify(e, &container)),
            });
        Box::pin(stream)
    }

    pub async fn stats_snapshot(&self, container: &str) -> Result<ContainerStats, DockerError> {
        let options = Some(StatsOptions {
            stream: false,
            ..Default::default()
        });
        let mut stream = self.client.stats(container, options);
        match stream.next().await {
            Some(Ok(stats)) => Ok(ContainerStats::from_response(container, &stats)),
            Some(Err(e)) => Err(DockerError::classify(e, container)),
            None => Err(DockerError::StreamClosed(format!("no stats sample for {}", container))),
        }
    }
}
