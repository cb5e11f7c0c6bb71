use bollard::container::Config;
use bollard::models::{
    ContainerInspectResponse, ContainerStateStatusEnum, DeviceMapping, HostConfig, Mount,
    MountTypeEnum, PortBinding, RestartPolicy, RestartPolicyNameEnum,
};
use std::collections::HashMap;

use super::runtime::{InstanceSpec, InstanceState};

/// Read, write and mknod on the passed-through device.
const DEVICE_CGROUP_PERMISSIONS: &str = "rwm";

impl From<ContainerStateStatusEnum> for InstanceState {
    fn from(status: ContainerStateStatusEnum) -> Self {
        match status {
            // Restarting containers are already being brought back by the daemon
            ContainerStateStatusEnum::RUNNING | ContainerStateStatusEnum::RESTARTING => {
                InstanceState::Running
            }
            ContainerStateStatusEnum::PAUSED => InstanceState::Paused,
            _ => InstanceState::Stopped,
        }
    }
}

pub(super) fn instance_state(info: &ContainerInspectResponse) -> InstanceState {
    let Some(state) = &info.state else {
        return InstanceState::Stopped;
    };

    match (state.status, state.running) {
        (Some(status), _) => InstanceState::from(status),
        (None, Some(true)) => InstanceState::Running,
        (None, _) => InstanceState::Stopped,
    }
}

pub(super) fn instance_config(spec: &InstanceSpec) -> Config<String> {
    let container_port = format!("{}/tcp", spec.container_port);
    let device_path = spec.device_path.to_string_lossy().into_owned();

    let host_config = HostConfig {
        port_bindings: Some(HashMap::from([(
            container_port.clone(),
            Some(vec![PortBinding {
                host_ip: None,
                host_port: Some(spec.host_port.to_string()),
            }]),
        )])),
        mounts: Some(vec![Mount {
            target: Some(spec.mount_target.clone()),
            source: Some(spec.storage_dir.to_string_lossy().into_owned()),
            typ: Some(MountTypeEnum::BIND),
            read_only: Some(false),
            ..Default::default()
        }]),
        devices: Some(vec![DeviceMapping {
            path_on_host: Some(device_path.clone()),
            path_in_container: Some(device_path),
            cgroup_permissions: Some(DEVICE_CGROUP_PERMISSIONS.to_string()),
        }]),
        restart_policy: Some(RestartPolicy {
            name: Some(RestartPolicyNameEnum::UNLESS_STOPPED),
            maximum_retry_count: None,
        }),
        ..Default::default()
    };

    Config {
        image: Some(spec.image.clone()),
        exposed_ports: Some(HashMap::from([(container_port, HashMap::new())])),
        host_config: Some(host_config),
        ..Default::default()
    }
}
