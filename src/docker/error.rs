use std::io;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use super::runtime::RuntimeError;
use crate::shared::models::{DatabaseError, InvalidRecord};

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Device {device} not found: {source}")]
    DeviceNotFound {
        device: String,
        source: io::Error,
    },

    #[error("Failed to list devices under {}: {source}", path.display())]
    DeviceDiscovery { path: PathBuf, source: io::Error },

    #[error("Port {port} was claimed by another container; gave up after {attempts} attempts")]
    PortAllocationConflict { port: u16, attempts: usize },

    #[error("No host port left above 65535")]
    PortRangeExhausted,

    #[error("Image {image} is not available: {source}")]
    ImageUnavailable { image: String, source: RuntimeError },

    #[error("Failed to create container {name}: {source}")]
    RuntimeCreateFailed { name: String, source: RuntimeError },

    #[error("Failed to start container {name}: {source}")]
    RuntimeStartFailed { name: String, source: RuntimeError },

    #[error("Failed to stop container {name}: {source}")]
    RuntimeStopFailed { name: String, source: RuntimeError },

    #[error("Failed to unpause container {name}: {source}")]
    RuntimeUnpauseFailed { name: String, source: RuntimeError },

    #[error("Failed to restart container {name}: {source}")]
    RuntimeRestartFailed { name: String, source: RuntimeError },

    #[error("Failed to remove container {name}: {source}")]
    RuntimeRemoveFailed { name: String, source: RuntimeError },

    #[error("Failed to inspect container {name}: {source}")]
    RuntimeInspectFailed { name: String, source: RuntimeError },

    #[error("Unknown container {0}")]
    UnknownIdentity(Uuid),

    #[error("Storage error at {}: {source}", path.display())]
    Storage { path: PathBuf, source: io::Error },

    /// The record is already gone; only the directory was left behind.
    #[error("Container {id} was deleted but its storage at {} remains: {source}", path.display())]
    OrphanedStorage {
        id: Uuid,
        path: PathBuf,
        source: io::Error,
    },

    #[error("Container store error: {0}")]
    Store(#[from] DatabaseError),
}

/// One record that did not converge during a reconciliation pass.
#[derive(Debug)]
pub struct ReconcileFailure {
    pub id: Uuid,
    pub error: LifecycleError,
}

#[derive(Error, Debug)]
#[error("{} container(s) failed to reconcile", failures.len() + invalid.len())]
pub struct PartialReconciliationFailure {
    pub failures: Vec<ReconcileFailure>,
    pub invalid: Vec<InvalidRecord>,
}
