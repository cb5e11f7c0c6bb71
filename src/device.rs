use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::docker::LifecycleError;

pub const DEFAULT_DEVICE_ROOT: &str = "/dev/serial/by-id";

/// Maps a device identifier (the name of a symlink under the discovery root)
/// to the canonical device node it currently points at.
#[derive(Debug, Clone)]
pub struct DeviceResolver {
    root: PathBuf,
}

impl DeviceResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Follows the symlink for `device`. Missing, dangling, or unreadable
    /// links all fail with [`LifecycleError::DeviceNotFound`].
    pub async fn resolve(&self, device: &str) -> Result<PathBuf, LifecycleError> {
        if !is_plain_name(device) {
            return Err(LifecycleError::DeviceNotFound {
                device: device.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a device identifier"),
            });
        }

        let link = self.root.join(device);
        let resolved = tokio::fs::canonicalize(&link)
            .await
            .map_err(|source| LifecycleError::DeviceNotFound {
                device: device.to_string(),
                source,
            })?;

        debug!("Resolved device {} to {}", device, resolved.display());
        Ok(resolved)
    }

    /// Device identifiers currently present, sorted. A missing discovery root
    /// means nothing is plugged in.
    pub async fn list(&self) -> io::Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut devices = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            // Symlinks report their own type here, so a link to a device node is not a dir
            if entry.file_type().await?.is_dir() {
                continue;
            }
            devices.push(entry.file_name().to_string_lossy().into_owned());
        }
        devices.sort();

        Ok(devices)
    }
}

fn is_plain_name(device: &str) -> bool {
    let mut components = Path::new(device).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
