//! Client: the `DockerOps` seam between the Docker source and the daemon.

pub mod docker;
pub mod fake;
pub mod live;
pub mod ssh;

pub use docker::DockerOps;
pub use fake::{FakeContainer, FakeDocker, FakeLogLine};
pub use live::Disconnected;
pub use ssh::SshDocker;
