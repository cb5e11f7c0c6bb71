use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::device::DeviceResolver;
use crate::docker::{client::DockerConfig, ContainerLifecycleManager, DockerClient, StorageManager};
use crate::shared::config::ManagerConfig;
use crate::shared::models::{AppState, DatabaseError};

/// Opens (creating if needed) the SQLite store and applies migrations.
pub async fn init_database(path: &Path) -> Result<SqlitePool, DatabaseError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations completed successfully");

    Ok(pool)
}

pub async fn initialize_app_state(config: &ManagerConfig) -> anyhow::Result<AppState> {
    let database_path = config.database_path();
    info!("Opening container database at {}", database_path.display());

    let db = match init_database(&database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database {}: {}", database_path.display(), e);
            return Err(e).context("Container database not available");
        }
    };

    info!("Initializing Docker service...");
    let docker = DockerClient::new(DockerConfig {
        socket_path: config.docker_socket.clone(),
    })
    .await
    .context("Docker is required to manage containers")?;

    let lifecycle = ContainerLifecycleManager::new(
        db,
        Arc::new(docker),
        DeviceResolver::new(&config.device_root),
        StorageManager::new(&config.storage_root),
        config.instance_settings(),
    );

    Ok(AppState {
        lifecycle: Arc::new(lifecycle),
    })
}
