use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Everything needed to create one device-bound container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSpec {
    pub name: String,
    pub image: String,
    pub container_port: u16,
    pub host_port: u16,
    pub storage_dir: PathBuf,
    pub mount_target: String,
    /// Canonical device node, exposed at the same path inside the container.
    pub device_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Running,
    Stopped,
    /// Frozen in place; `start` is rejected until it is unpaused.
    Paused,
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("No such container or image: {0}")]
    NotFound(String),

    #[error("Docker daemon returned {status}: {message}")]
    Daemon { status: u16, message: String },

    #[error("Docker error: {0}")]
    Docker(#[from] bollard::errors::Error),
}

/// The operations the lifecycle manager needs from a container engine.
/// Every call addresses a single container by name, or a single image.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Pulls `image` unless it is already present locally.
    async fn ensure_image(&self, image: &str) -> Result<(), RuntimeError>;

    /// Creates (without starting) a container with an unless-stopped restart policy.
    async fn create(&self, spec: &InstanceSpec) -> Result<String, RuntimeError>;

    async fn start(&self, name: &str) -> Result<(), RuntimeError>;

    async fn stop(&self, name: &str, timeout: Duration) -> Result<(), RuntimeError>;

    async fn restart(&self, name: &str, timeout: Duration) -> Result<(), RuntimeError>;

    async fn unpause(&self, name: &str) -> Result<(), RuntimeError>;

    /// Forced removal; a running container is killed first.
    async fn remove(&self, name: &str) -> Result<(), RuntimeError>;

    /// `Ok(None)` when no container has this name.
    async fn inspect(&self, name: &str) -> Result<Option<InstanceState>, RuntimeError>;
}
