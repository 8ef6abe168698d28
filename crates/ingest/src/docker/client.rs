//! Docker client: core struct, constructor, error types.
//!
//! Domain methods live in sibling modules (`container`, `stats`) which add
//! `impl DockerClient` blocks.

use bollard::Docker;
use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Error, Debug)]
pub enum DockerError {
    #[error("Docker connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Container not found: {0}")]
    ContainerNotFound(String),
    #[error("Permission denied on Docker socket")]
    PermissionDenied,
    #[error("Log stream closed: {0}")]
    StreamClosed(String),
    #[error("Docker request timed out: {0}")]
    Timeout(String),
    #[error("docker command failed: {0}")]
    CommandFailed(String),
    #[error("Bollard error: {0}")]
    BollardError(#[from] bollard::errors::Error),
}

impl DockerError {
    /// 404 → not found, 401/403 → permission, transport failures → connection.
    pub fn classify(err: bollard::errors::Error, container: &str) -> Self {
        use bollard::errors::Error as B;
        match err {
            B::DockerResponseServerError { status_code: 404, .. } => {
                DockerError::ContainerNotFound(container.to_string())
            }
            B::DockerResponseServerError { status_code: 401 | 403, .. } => {
                DockerError::PermissionDenied
            }
            B::IOError { err } if err.kind() == std::io::ErrorKind::PermissionDenied => {
                DockerError::PermissionDenied
            }
            B::IOError { err } => DockerError::ConnectionFailed(err.to_string()),
            other => DockerError::BollardError(other),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DockerError::ConnectionFailed(_) | DockerError::PermissionDenied => {
                ErrorKind::SourceUnavailable
            }
            _ => ErrorKind::PartialSourceFailure,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DockerClient {
    /// `pub(super)` so domain modules in sibling files can call bollard
    /// APIs directly.
    pub(super) client: Docker,
    pub(super) socket_path: String,
}

impl DockerClient {
    /// Empty path → bollard defaults (`DOCKER_HOST` or the platform socket).
    pub fn new(socket_path: &str) -> Result<Self, DockerError> {
        let connection = if socket_path.is_empty() {
            Docker::connect_with_defaults()
                .map_err(|e| DockerError::ConnectionFailed(e.to_string()))?
        } else {
            let clean_path = socket_path.trim_start_matches("unix://");
            Docker::connect_with_socket(clean_path, 120, &bollard::API_DEFAULT_VERSION)
                .map_err(|e| DockerError::ConnectionFailed(e.to_string()))?
        };

        Ok(DockerClient {
            client: connection,
            socket_path: socket_path.to_string(),
        })
    }

    pub fn socket_path(&self) -> &str {
        &self.socket_path
    }

    /// Round-trip to the daemon; surfaces a dead or unreadable socket before
    /// any per-container work starts.
    pub async fn ping(&self) -> Result<(), DockerError> {
        self.client
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| DockerError::classify(e, ""))
    }
}
