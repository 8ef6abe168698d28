//! Live: implements `DockerOps` for the real Bollard-backed `DockerClient`,
//! plus the stand-in used when no connection could be set up.

use std::pin::Pin;

use crate::client::docker::DockerOps;
use crate::docker::client::{DockerClient, DockerError};
use crate::docker::inventory::ContainerInfo;
use crate::docker::stats::ContainerStats;
use crate::docker::stream::{LogLineStream, LogRequest};

impl DockerOps for DockerClient {
    fn list_running(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<ContainerInfo>, DockerError>> + Send + '_>> {
        Box::pin(self.list_running_containers())
    }

    /// Bollard's logs call is lazy: a missing container or a dead socket
    /// arrives as the first stream item, not as an error here.
    fn fetch_logs(
        &self,
        request: LogRequest,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<LogLineStream, DockerError>> + Send + '_>> {
        Box::pin(async move { Ok(DockerClient::fetch_logs(self, request)) })
    }

    fn stats_snapshot<'a>(
        &'a self,
        container: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ContainerStats, DockerError>> + Send + 'a>> {
        Box::pin(DockerClient::stats_snapshot(self, container))
    }
}

/// A daemon that could not be connected. Every call fails with the original
/// reason, so the Docker source reports itself unavailable at fetch time and
/// the other sources of the run still proceed.
#[derive(Debug, Clone)]
pub struct Disconnected {
    reason: String,
}

impl Disconnected {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    fn error(&self) -> DockerError {
        DockerError::ConnectionFailed(self.reason.clone())
    }
}

impl DockerOps for Disconnected {
    fn list_running(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<ContainerInfo>, DockerError>> + Send + '_>> {
        Box::pin(async move { Err(self.error()) })
    }

    fn fetch_logs(
        &self,
        _request: LogRequest,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<LogLineStream, DockerError>> + Send + '_>> {
        Box::pin(async move { Err(self.error()) })
    }

    fn stats_snapshot<'a>(
        &'a self,
        _container: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ContainerStats, DockerError>> + Send + 'a>> {
        Box::pin(async move { Err(self.error()) })
    }
}
