//! Docker trait: abstract interface for the Docker operations the Docker
//! source needs.
//!
//! `live.rs` provides the real Bollard-backed implementation.
//! `fake.rs` provides a test double.

use std::pin::Pin;

use crate::docker::client::DockerError;
use crate::docker::inventory::ContainerInfo;
use crate::docker::stats::ContainerStats;
use crate::docker::stream::{LogLineStream, LogRequest};

/// Unified async interface over the Docker daemon.
///
/// Object-safe thanks to `Pin<Box<…>>` returns. Implementations must be
/// `Send + Sync` so they can be shared across concurrent container fetches.
pub trait DockerOps: Send + Sync {
    fn list_running(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<ContainerInfo>, DockerError>> + Send + '_>>;

    fn fetch_logs(
        &self,
        request: LogRequest,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<LogLineStream, DockerError>> + Send + '_>>;

    fn stats_snapshot<'a>(
        &'a self,
        container: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ContainerStats, DockerError>> + Send + 'a>>;
}
