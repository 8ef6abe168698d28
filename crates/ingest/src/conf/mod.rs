//! Conf module: ingestion configuration model.

pub mod model;

pub use model::{
    DockerSourceConfig, FilterConfig, IngestConfig, NormalizerConfig, SshConfig,
    VolatileRuleConfig, DEFAULT_DOCKER_SOCKET,
};
