use futures::future::join_all;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::{PartialReconciliationFailure, ReconcileFailure};
use super::naming::derive_instance_name;
use super::ports::{next_port, DEFAULT_BASE_PORT};
use super::runtime::{ContainerRuntime, InstanceSpec, InstanceState, RuntimeError};
use super::status::StatusCache;
use super::volume::StorageManager;
use super::LifecycleError;
use crate::device::DeviceResolver;
use crate::shared::models::{ContainerRecord, DatabaseError, InvalidRecord};

/// Attempts at allocate/create/insert before a port conflict is surfaced.
const MAX_CREATE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct InstanceSettings {
    pub image: String,
    pub container_port: u16,
    pub mount_target: String,
    pub base_port: u16,
    pub stop_timeout: Duration,
}

impl Default for InstanceSettings {
    fn default() -> Self {
        Self {
            image: "octoprint/octoprint:latest".to_string(),
            container_port: 80,
            mount_target: "/octoprint".to_string(),
            base_port: DEFAULT_BASE_PORT,
            stop_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedContainer {
    pub id: Uuid,
    pub instance_name: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ContainerSummary {
    pub id: Uuid,
    pub port: u16,
    pub name: Option<String>,
    pub device: String,
    /// Whether the last lifecycle operation on this container succeeded.
    pub status: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub name: String,
    pub in_use: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    AlreadyRunning,
    Started,
    Unpaused,
    Recreated,
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub converged: Vec<(Uuid, ReconcileAction)>,
    pub failures: Vec<ReconcileFailure>,
    /// Stored rows that could not be read back as records.
    pub invalid: Vec<InvalidRecord>,
}

impl ReconcileReport {
    /// Whether each container ended the pass running.
    pub fn outcomes(&self) -> HashMap<Uuid, bool> {
        self.converged
            .iter()
            .map(|(id, _)| (*id, true))
            .chain(self.failures.iter().map(|failure| (failure.id, false)))
            .collect()
    }

    pub fn into_result(self) -> Result<Vec<(Uuid, ReconcileAction)>, PartialReconciliationFailure> {
        if self.failures.is_empty() && self.invalid.is_empty() {
            Ok(self.converged)
        } else {
            Err(PartialReconciliationFailure {
                failures: self.failures,
                invalid: self.invalid,
            })
        }
    }
}

/// One async mutex per container id.
#[derive(Default)]
struct IdentityLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl IdentityLocks {
    async fn acquire(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self.locks.lock().await.entry(id).or_default().clone();
        lock.lock_owned().await
    }

    async fn forget(&self, id: Uuid) {
        self.locks.lock().await.remove(&id);
    }
}

/// Converges the containers recorded in the store with what the runtime
/// actually has, and owns every mutation of either.
pub struct ContainerLifecycleManager {
    db: SqlitePool,
    runtime: Arc<dyn ContainerRuntime>,
    devices: DeviceResolver,
    storage: StorageManager,
    status: StatusCache,
    settings: InstanceSettings,
    // Serializes port allocation through record insertion
    create_lock: Mutex<()>,
    // Held by delete, restart and each reconcile of one container
    identity_locks: IdentityLocks,
}

impl ContainerLifecycleManager {
    pub fn new(
        db: SqlitePool,
        runtime: Arc<dyn ContainerRuntime>,
        devices: DeviceResolver,
        storage: StorageManager,
        settings: InstanceSettings,
    ) -> Self {
        Self {
            db,
            runtime,
            devices,
            storage,
            status: StatusCache::new(),
            settings,
            create_lock: Mutex::new(()),
            identity_locks: IdentityLocks::default(),
        }
    }

    pub async fn ensure_image(&self) -> Result<(), LifecycleError> {
        let image = &self.settings.image;
        self.runtime
            .ensure_image(image)
            .await
            .map_err(|source| LifecycleError::ImageUnavailable {
                image: image.clone(),
                source,
            })
    }

    pub async fn create(&self, device: &str) -> Result<CreatedContainer, LifecycleError> {
        let device_path = self.devices.resolve(device).await?;

        let _guard = self.create_lock.lock().await;

        let records = ContainerRecord::find_all(&self.db).await?;
        if let Some(existing) = records.iter().find(|r| r.device == device) {
            warn!(
                "Device {} is already bound to container {}; creating another",
                device, existing.id
            );
        }
        let mut ports = ContainerRecord::ports(&self.db).await?;

        let id = Uuid::new_v4();
        let name = derive_instance_name(&id);
        let storage_dir = self.storage.provision(id).await?;

        info!("Creating container {} for device {}", name, device);

        let mut last_port = self.settings.base_port;
        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            let port = next_port(self.settings.base_port, ports.iter().copied())?;
            last_port = port;

            let spec = self.instance_spec(id, port, storage_dir.clone(), device_path.clone());
            self.launch(&spec, true).await?;

            let record = ContainerRecord {
                id,
                device: device.to_string(),
                port,
                name: None,
            };
            match record.insert(&self.db).await {
                Ok(()) => {
                    self.status.record(id, true).await;
                    info!("Container {} is running on port {}", name, port);
                    return Ok(CreatedContainer {
                        id,
                        instance_name: name,
                        port,
                    });
                }
                Err(DatabaseError::PortTaken(taken)) => {
                    warn!(
                        "Port {} was claimed concurrently (attempt {}/{})",
                        taken, attempt, MAX_CREATE_ATTEMPTS
                    );
                    self.discard(&name).await;
                    ports = ContainerRecord::ports(&self.db).await?;
                }
                Err(e) => {
                    self.discard(&name).await;
                    return Err(e.into());
                }
            }
        }

        Err(LifecycleError::PortAllocationConflict {
            port: last_port,
            attempts: MAX_CREATE_ATTEMPTS,
        })
    }

    /// Brings every recorded container to the running state. Failures are
    /// collected per container; only an unreadable store fails the call.
    pub async fn reconcile_all(&self) -> Result<ReconcileReport, LifecycleError> {
        let (records, invalid) = ContainerRecord::scan(&self.db).await?;
        info!("Reconciling {} container(s)", records.len());

        let results = join_all(
            records
                .iter()
                .map(|record| async move { (record.id, self.reconcile_one(record.id).await) }),
        )
        .await;

        let mut report = ReconcileReport::default();
        for row in invalid {
            error!("Cannot reconcile unreadable container row {}: {}", row.id, row.error);
            report.invalid.push(row);
        }
        for (id, result) in results {
            match result {
                Ok(None) => debug!("Container {} was deleted during reconciliation", id),
                Ok(Some(action)) => {
                    debug!("Container {} reconciled: {:?}", id, action);
                    report.converged.push((id, action));
                }
                Err(error) => {
                    error!("Failed to reconcile container {}: {}", id, error);
                    report.failures.push(ReconcileFailure { id, error });
                }
            }
        }

        let outcomes = report.outcomes();
        info!(
            "Reconciliation finished: {} running, {} failed",
            outcomes.values().filter(|running| **running).count(),
            outcomes.values().filter(|running| !**running).count() + report.invalid.len()
        );
        Ok(report)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), LifecycleError> {
        let Some((_guard, _)) = self.lock_record(id).await? else {
            return Err(LifecycleError::UnknownIdentity(id));
        };

        let name = derive_instance_name(&id);
        info!("Deleting container {}", name);

        if let Err(source) = self.runtime.stop(&name, self.settings.stop_timeout).await {
            let err = LifecycleError::RuntimeStopFailed {
                name: name.clone(),
                source,
            };
            warn!("{} (may not exist); removing anyway", err);
        }

        match self.runtime.remove(&name).await {
            Ok(()) => {}
            Err(RuntimeError::NotFound(_)) => debug!("Container {} was already gone", name),
            Err(source) => return Err(LifecycleError::RuntimeRemoveFailed { name, source }),
        }

        ContainerRecord::delete(&self.db, id).await?;
        self.status.evict(id).await;
        self.identity_locks.forget(id).await;

        self.storage
            .remove(id)
            .await
            .map_err(|(path, source)| LifecycleError::OrphanedStorage { id, path, source })?;

        info!("Container {} deleted", name);
        Ok(())
    }

    /// Restarts the container, recreating it from its record when the
    /// runtime no longer has it.
    pub async fn restart(&self, id: Uuid) -> Result<(), LifecycleError> {
        let Some((_guard, record)) = self.lock_record(id).await? else {
            return Err(LifecycleError::UnknownIdentity(id));
        };

        let result = self.restart_record(&record).await;
        self.status.record(id, result.is_ok()).await;
        result
    }

    /// Only the stored display name changes; the container is left alone.
    pub async fn rename(&self, id: Uuid, name: Option<&str>) -> Result<(), LifecycleError> {
        if !ContainerRecord::update_name(&self.db, id, name).await? {
            return Err(LifecycleError::UnknownIdentity(id));
        }
        info!("Renamed container {} to {:?}", id, name);
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<ContainerSummary>, LifecycleError> {
        let records = ContainerRecord::find_all(&self.db).await?;

        let mut summaries = Vec::with_capacity(records.len());
        for record in records {
            summaries.push(ContainerSummary {
                status: self.status.get(record.id).await,
                id: record.id,
                port: record.port,
                name: record.name,
                device: record.device,
            });
        }
        Ok(summaries)
    }

    /// Devices currently plugged in, flagged when a container is bound to them.
    pub async fn list_devices(&self) -> Result<Vec<DeviceInfo>, LifecycleError> {
        let present = self
            .devices
            .list()
            .await
            .map_err(|source| LifecycleError::DeviceDiscovery {
                path: self.devices.root().to_path_buf(),
                source,
            })?;

        let used: HashSet<String> = ContainerRecord::find_all(&self.db)
            .await?
            .into_iter()
            .map(|record| record.device)
            .collect();

        Ok(present
            .into_iter()
            .map(|name| DeviceInfo {
                in_use: used.contains(&name),
                name,
            })
            .collect())
    }

    /// Locks `id` and returns its record as stored once the lock is held.
    /// `None` when there is no record, before or after waiting.
    async fn lock_record(
        &self,
        id: Uuid,
    ) -> Result<Option<(OwnedMutexGuard<()>, ContainerRecord)>, LifecycleError> {
        if ContainerRecord::find_by_id(&self.db, id).await?.is_none() {
            return Ok(None);
        }

        let guard = self.identity_locks.acquire(id).await;
        Ok(ContainerRecord::find_by_id(&self.db, id)
            .await?
            .map(|record| (guard, record)))
    }

    /// `Ok(None)` when the record was deleted before the lock was acquired.
    async fn reconcile_one(&self, id: Uuid) -> Result<Option<ReconcileAction>, LifecycleError> {
        let Some((_guard, record)) = self.lock_record(id).await? else {
            return Ok(None);
        };

        let result = self.converge(&record).await;
        self.status.record(id, result.is_ok()).await;
        result.map(Some)
    }

    async fn converge(&self, record: &ContainerRecord) -> Result<ReconcileAction, LifecycleError> {
        let name = derive_instance_name(&record.id);

        let action = match self.inspect(&name).await? {
            Some(InstanceState::Running) => ReconcileAction::AlreadyRunning,
            Some(InstanceState::Stopped) => {
                info!("Starting stopped container {}", name);
                self.runtime
                    .start(&name)
                    .await
                    .map_err(|source| LifecycleError::RuntimeStartFailed { name, source })?;
                ReconcileAction::Started
            }
            Some(InstanceState::Paused) => {
                info!("Unpausing container {}", name);
                self.runtime
                    .unpause(&name)
                    .await
                    .map_err(|source| LifecycleError::RuntimeUnpauseFailed { name, source })?;
                ReconcileAction::Unpaused
            }
            None => {
                info!("Container {} is missing; recreating", name);
                self.recreate(record).await?;
                ReconcileAction::Recreated
            }
        };
        Ok(action)
    }

    async fn restart_record(&self, record: &ContainerRecord) -> Result<(), LifecycleError> {
        let name = derive_instance_name(&record.id);

        match self.inspect(&name).await? {
            Some(_) => self
                .runtime
                .restart(&name, self.settings.stop_timeout)
                .await
                .map_err(|source| LifecycleError::RuntimeRestartFailed { name, source }),
            None => {
                info!("Container {} is missing; recreating", name);
                self.recreate(record).await
            }
        }
    }

    /// Builds a fresh instance from a record's device and port.
    async fn recreate(&self, record: &ContainerRecord) -> Result<(), LifecycleError> {
        let device_path = self.devices.resolve(&record.device).await?;
        let storage_dir = self.storage.provision(record.id).await?;
        let spec = self.instance_spec(record.id, record.port, storage_dir, device_path);
        self.launch(&spec, false).await
    }

    async fn inspect(&self, name: &str) -> Result<Option<InstanceState>, LifecycleError> {
        self.runtime
            .inspect(name)
            .await
            .map_err(|source| LifecycleError::RuntimeInspectFailed {
                name: name.to_string(),
                source,
            })
    }

    async fn launch(&self, spec: &InstanceSpec, discard_on_failure: bool) -> Result<(), LifecycleError> {
        self.runtime
            .create(spec)
            .await
            .map_err(|source| LifecycleError::RuntimeCreateFailed {
                name: spec.name.clone(),
                source,
            })?;

        if let Err(source) = self.runtime.start(&spec.name).await {
            if discard_on_failure {
                self.discard(&spec.name).await;
            }
            return Err(LifecycleError::RuntimeStartFailed {
                name: spec.name.clone(),
                source,
            });
        }

        Ok(())
    }

    async fn discard(&self, name: &str) {
        if let Err(e) = self.runtime.remove(name).await {
            warn!("Failed to discard container {}: {}", name, e);
        }
    }

    fn instance_spec(&self, id: Uuid, port: u16, storage_dir: PathBuf, device_path: PathBuf) -> InstanceSpec {
        InstanceSpec {
            name: derive_instance_name(&id),
            image: self.settings.image.clone(),
            container_port: self.settings.container_port,
            host_port: port,
            storage_dir,
            mount_target: self.settings.mount_target.clone(),
            device_path,
        }
    }
}
