pub mod client;
mod container;
mod error;
mod lifecycle;
pub mod naming;
pub mod ports;
pub mod runtime;
mod status;
mod volume;

#[cfg(test)]
pub(crate) mod testing;

pub use client::DockerClient;
pub use error::LifecycleError;
pub use lifecycle::{
    ContainerLifecycleManager, ContainerSummary, DeviceInfo, InstanceSettings, ReconcileAction,
};
pub use volume::StorageManager;
