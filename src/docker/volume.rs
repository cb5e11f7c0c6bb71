use std::io;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use super::LifecycleError;

/// Per-container storage directories, one per identity under a fixed root.
#[derive(Debug, Clone)]
pub struct StorageManager {
    base_path: PathBuf,
}

impl StorageManager {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn path_for(&self, id: Uuid) -> PathBuf {
        self.base_path.join(id.hyphenated().to_string())
    }

    /// Idempotent: an existing directory is kept as is.
    pub async fn provision(&self, id: Uuid) -> Result<PathBuf, LifecycleError> {
        let path = self.path_for(id);

        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|source| LifecycleError::Storage {
                path: path.clone(),
                source,
            })?;

        info!("Provisioned storage for container {} at {}", id, path.display());
        Ok(path)
    }

    /// Removes the directory and its contents. A missing directory is not an error.
    pub async fn remove(&self, id: Uuid) -> Result<(), (PathBuf, io::Error)> {
        let path = self.path_for(id);

        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                info!("Removed storage for container {} at {}", id, path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Storage for container {} not found at {}", id, path.display());
                Ok(())
            }
            Err(e) => Err((path, e)),
        }
    }
}
