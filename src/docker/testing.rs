use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::os::unix::fs::symlink;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use super::runtime::{ContainerRuntime, InstanceSpec, InstanceState, RuntimeError};
use super::{ContainerLifecycleManager, InstanceSettings, StorageManager};
use crate::device::DeviceResolver;
use crate::shared::init_database;
use crate::shared::models::ContainerRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuntimeCall {
    EnsureImage(String),
    Create(String),
    Start(String),
    Stop(String),
    Restart(String),
    Unpause(String),
    Remove(String),
    Inspect(String),
}

impl RuntimeCall {
    fn is_mutation(&self) -> bool {
        !matches!(self, RuntimeCall::Inspect(_) | RuntimeCall::EnsureImage(_))
    }
}

#[derive(Debug, Clone)]
pub struct FakeInstance {
    pub spec: Option<InstanceSpec>,
    pub running: bool,
    pub paused: bool,
}

#[derive(Default)]
struct FakeState {
    instances: HashMap<String, FakeInstance>,
    calls: Vec<RuntimeCall>,
    failures: HashSet<RuntimeCall>,
    starts_broken: bool,
    port_thief: Option<(SqlitePool, usize)>,
    inspect_delay: Option<Duration>,
}

/// In-memory container engine that records every call.
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<FakeState>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a container that exists before the manager touches anything.
    pub fn with_instance(&self, name: &str, running: bool) {
        self.state
            .lock()
            .unwrap()
            .instances
            .insert(
                name.to_string(),
                FakeInstance {
                    spec: None,
                    running,
                    paused: false,
                },
            );
    }

    /// Registers a running container that has been paused.
    pub fn with_paused_instance(&self, name: &str) {
        self.state.lock().unwrap().instances.insert(
            name.to_string(),
            FakeInstance {
                spec: None,
                running: true,
                paused: true,
            },
        );
    }

    /// Every inspect waits this long before answering.
    pub fn slow_inspects(&self, delay: Duration) {
        self.state.lock().unwrap().inspect_delay = Some(delay);
    }

    /// Makes the given call fail with a daemon error every time.
    pub fn fail_on(&self, call: RuntimeCall) {
        self.state.lock().unwrap().failures.insert(call);
    }

    /// Every start fails, whatever the container name.
    pub fn break_starts(&self) {
        self.state.lock().unwrap().starts_broken = true;
    }

    /// The next `times` creates race with another writer that records a
    /// container on the same host port first.
    pub fn steal_ports(&self, pool: SqlitePool, times: usize) {
        self.state.lock().unwrap().port_thief = Some((pool, times));
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<RuntimeCall> {
        self.calls().into_iter().filter(RuntimeCall::is_mutation).collect()
    }

    pub fn instance(&self, name: &str) -> Option<FakeInstance> {
        self.state.lock().unwrap().instances.get(name).cloned()
    }

    pub fn instance_count(&self) -> usize {
        self.state.lock().unwrap().instances.len()
    }

    fn begin(&self, call: RuntimeCall) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.clone());
        let broken_start = state.starts_broken && matches!(call, RuntimeCall::Start(_));
        if broken_start || state.failures.contains(&call) {
            return Err(RuntimeError::Daemon {
                status: 500,
                message: format!("injected failure: {call:?}"),
            });
        }
        Ok(())
    }

    fn with_existing<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut FakeInstance) -> T,
    ) -> Result<T, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state
            .instances
            .get_mut(name)
            .map(f)
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))
    }

    fn take_thief(&self) -> Option<SqlitePool> {
        let mut state = self.state.lock().unwrap();
        match state.port_thief.take() {
            Some((pool, times)) if times > 0 => {
                if times > 1 {
                    state.port_thief = Some((pool.clone(), times - 1));
                }
                Some(pool)
            }
            _ => None,
        }
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ensure_image(&self, image: &str) -> Result<(), RuntimeError> {
        self.begin(RuntimeCall::EnsureImage(image.to_string()))
    }

    async fn create(&self, spec: &InstanceSpec) -> Result<String, RuntimeError> {
        self.begin(RuntimeCall::Create(spec.name.clone()))?;

        if let Some(pool) = self.take_thief() {
            ContainerRecord::new("usb-thief", spec.host_port)
                .insert(&pool)
                .await
                .expect("thief insert");
        }

        let mut state = self.state.lock().unwrap();
        if state.instances.contains_key(&spec.name) {
            return Err(RuntimeError::Daemon {
                status: 409,
                message: format!("name {} already in use", spec.name),
            });
        }
        let port_in_use = state
            .instances
            .values()
            .filter_map(|instance| instance.spec.as_ref())
            .any(|existing| existing.host_port == spec.host_port);
        if port_in_use {
            return Err(RuntimeError::Daemon {
                status: 500,
                message: format!("port {} is already allocated", spec.host_port),
            });
        }

        state.instances.insert(
            spec.name.clone(),
            FakeInstance {
                spec: Some(spec.clone()),
                running: false,
                paused: false,
            },
        );
        Ok(format!("id-{}", spec.name))
    }

    async fn start(&self, name: &str) -> Result<(), RuntimeError> {
        self.begin(RuntimeCall::Start(name.to_string()))?;
        if self.instance(name).is_some_and(|instance| instance.paused) {
            return Err(RuntimeError::Daemon {
                status: 409,
                message: format!("container {name} is paused"),
            });
        }
        self.with_existing(name, |instance| instance.running = true)
    }

    async fn stop(&self, name: &str, _timeout: Duration) -> Result<(), RuntimeError> {
        self.begin(RuntimeCall::Stop(name.to_string()))?;
        self.with_existing(name, |instance| {
            instance.running = false;
            instance.paused = false;
        })
    }

    async fn restart(&self, name: &str, _timeout: Duration) -> Result<(), RuntimeError> {
        self.begin(RuntimeCall::Restart(name.to_string()))?;
        self.with_existing(name, |instance| {
            instance.running = true;
            instance.paused = false;
        })
    }

    async fn unpause(&self, name: &str) -> Result<(), RuntimeError> {
        self.begin(RuntimeCall::Unpause(name.to_string()))?;
        self.with_existing(name, |instance| instance.paused = false)
    }

    async fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        self.begin(RuntimeCall::Remove(name.to_string()))?;
        self.state
            .lock()
            .unwrap()
            .instances
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))
    }

    async fn inspect(&self, name: &str) -> Result<Option<InstanceState>, RuntimeError> {
        self.begin(RuntimeCall::Inspect(name.to_string()))?;
        let delay = self.state.lock().unwrap().inspect_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.instance(name).map(|instance| {
            if instance.paused {
                InstanceState::Paused
            } else if instance.running {
                InstanceState::Running
            } else {
                InstanceState::Stopped
            }
        }))
    }
}

/// A manager wired to a fake runtime, a temp SQLite store, a temp storage
/// root and a symlink tree holding one link per device.
pub struct Harness {
    pub manager: Arc<ContainerLifecycleManager>,
    pub runtime: Arc<FakeRuntime>,
    pub db: SqlitePool,
    pub storage_root: PathBuf,
    tmp: TempDir,
}

impl Harness {
    pub async fn new(devices: &[&str]) -> Self {
        let tmp = TempDir::new().expect("temp dir");
        let nodes = tmp.path().join("dev");
        let by_id = tmp.path().join("by-id");
        let storage_root = tmp.path().join("storage");
        std::fs::create_dir_all(&nodes).unwrap();
        std::fs::create_dir_all(&by_id).unwrap();

        for device in devices {
            let node = nodes.join(format!("{device}-node"));
            std::fs::write(&node, "").unwrap();
            symlink(&node, by_id.join(device)).unwrap();
        }

        let db = init_database(&tmp.path().join("octoprint.db"))
            .await
            .expect("database");
        let runtime = Arc::new(FakeRuntime::new());
        let manager = ContainerLifecycleManager::new(
            db.clone(),
            runtime.clone(),
            DeviceResolver::new(&by_id),
            StorageManager::new(&storage_root),
            InstanceSettings::default(),
        );

        Self {
            manager: Arc::new(manager),
            runtime,
            db,
            storage_root,
            tmp,
        }
    }

    /// Canonical node a device link resolves to.
    pub fn device_node(&self, device: &str) -> PathBuf {
        std::fs::canonicalize(self.tmp.path().join("dev").join(format!("{device}-node"))).unwrap()
    }

    pub fn storage_dirs(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.storage_root) {
            Ok(entries) => entries.map(|entry| entry.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}
