use std::sync::Arc;
use thiserror::Error;

use crate::docker::ContainerLifecycleManager;

pub mod container;

pub use container::{ContainerRecord, InvalidRecord};

// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("UUID parse error: {0}")]
    UuidParse(#[from] uuid::Error),
    #[error("Port {0} is already assigned to another container")]
    PortTaken(u16),
    #[error("Stored port {0} is not a valid TCP port")]
    InvalidPort(i64),
}

// Application state
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<ContainerLifecycleManager>,
}
