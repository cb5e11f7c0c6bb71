use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::device::DEFAULT_DEVICE_ROOT;
use crate::docker::ports::DEFAULT_BASE_PORT;
use crate::docker::InstanceSettings;

pub const DATABASE_FILE: &str = "octoprint.db";

#[derive(Debug, Clone, Args)]
pub struct ManagerConfig {
    /// Directory holding the container database and logs
    #[arg(long, env = "OCTOPRINT_MANAGER_CONFIG", default_value = "./config", global = true)]
    pub config_dir: PathBuf,

    /// Root under which each container gets its own storage directory
    #[arg(long, env = "OCTOPRINT_STORAGE_ROOT", default_value = "/mnt/storage/octoprint", global = true)]
    pub storage_root: PathBuf,

    /// Directory of per-device symlinks used to discover serial devices
    #[arg(long, env = "OCTOPRINT_DEVICE_ROOT", default_value = DEFAULT_DEVICE_ROOT, global = true)]
    pub device_root: PathBuf,

    /// Image every container runs
    #[arg(long, env = "OCTOPRINT_IMAGE", default_value = "octoprint/octoprint:latest", global = true)]
    pub image: String,

    /// TCP port the application listens on inside the container
    #[arg(long, default_value_t = 80, global = true)]
    pub container_port: u16,

    /// Path inside the container where the storage directory is mounted
    #[arg(long, default_value = "/octoprint", global = true)]
    pub mount_target: String,

    /// First host port handed out when no container exists yet
    #[arg(long, default_value_t = DEFAULT_BASE_PORT, global = true)]
    pub base_port: u16,

    /// Seconds to wait for a container to stop before it is removed
    #[arg(long, default_value_t = 10, global = true)]
    pub stop_timeout: u64,

    /// Docker socket path (bollard defaults when unset)
    #[arg(long, env = "DOCKER_SOCKET", global = true)]
    pub docker_socket: Option<String>,
}

impl ManagerConfig {
    /// Makes `config_dir` absolute and creates it.
    pub fn prepare(mut self) -> Result<Self> {
        self.config_dir = absolute(&self.config_dir)
            .context("Failed to resolve config directory path")?;
        std::fs::create_dir_all(&self.config_dir)
            .with_context(|| format!("Failed to create config directory {}", self.config_dir.display()))?;
        Ok(self)
    }

    pub fn database_path(&self) -> PathBuf {
        self.config_dir.join(DATABASE_FILE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.config_dir.join("logs")
    }

    pub fn instance_settings(&self) -> InstanceSettings {
        InstanceSettings {
            image: self.image.clone(),
            container_port: self.container_port,
            mount_target: self.mount_target.clone(),
            base_port: self.base_port,
            stop_timeout: Duration::from_secs(self.stop_timeout),
        }
    }
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
