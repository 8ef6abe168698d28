//! Docker daemon access over bollard.

pub mod client;
pub mod container;
pub mod inventory;
pub mod stats;
pub mod stream;

pub use client::{DockerClient, DockerError};
pub use inventory::ContainerInfo;
pub use stats::ContainerStats;
pub use stream::{LogLine, LogLineStream, LogRequest, StreamKind};
