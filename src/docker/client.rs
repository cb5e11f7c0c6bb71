use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::container::{
    CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
    RestartContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::{Docker, API_DEFAULT_VERSION};
use futures::stream::StreamExt;
use std::time::Duration;
use tracing::{debug, error, info};

use super::container::{instance_config, instance_state};
use super::runtime::{ContainerRuntime, InstanceSpec, InstanceState, RuntimeError};

#[derive(Debug, Clone, Default)]
pub struct DockerConfig {
    pub socket_path: Option<String>,
}

pub struct DockerClient {
    docker: Docker,
}

impl DockerClient {
    pub async fn new(config: DockerConfig) -> Result<Self> {
        let docker = if let Some(socket) = config.socket_path {
            Docker::connect_with_socket(&socket, 120, &API_DEFAULT_VERSION)?
        } else {
            Docker::connect_with_socket_defaults()?
        };

        // Test connection
        let version = docker
            .version()
            .await
            .context("Failed to connect to Docker daemon")?;

        info!("Connected to Docker daemon version: {}", version.version.unwrap_or_default());

        Ok(Self { docker })
    }

    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(e) => match classify(image, e) {
                RuntimeError::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        info!("Pulling Docker image: {}", image);

        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);

        while let Some(progress) = stream.next().await {
            match progress {
                Ok(progress) => {
                    if let Some(status) = progress.status {
                        debug!("Pull status: {}", status);
                    }
                }
                Err(e) => {
                    error!("Error pulling image: {}", e);
                    return Err(classify(image, e));
                }
            }
        }

        info!("Successfully pulled image: {}", image);
        Ok(())
    }
}

/// Separates "no such object" from every other daemon failure.
fn classify(target: &str, err: BollardError) -> RuntimeError {
    match err {
        BollardError::DockerResponseServerError {
            status_code: 404, ..
        } => RuntimeError::NotFound(target.to_string()),
        BollardError::DockerResponseServerError {
            status_code,
            message,
        } => RuntimeError::Daemon {
            status: status_code,
            message,
        },
        other => RuntimeError::Docker(other),
    }
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn ensure_image(&self, image: &str) -> Result<(), RuntimeError> {
        if self.image_exists(image).await? {
            debug!("Image {} already present", image);
            return Ok(());
        }
        self.pull_image(image).await
    }

    async fn create(&self, spec: &InstanceSpec) -> Result<String, RuntimeError> {
        let options = CreateContainerOptions {
            name: spec.name.as_str(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), instance_config(spec))
            .await
            .map_err(|e| classify(&spec.name, e))?;

        info!("Created container {} with ID: {}", spec.name, response.id);
        Ok(response.id)
    }

    async fn start(&self, name: &str) -> Result<(), RuntimeError> {
        self.docker
            .start_container(name, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| classify(name, e))?;

        info!("Started container: {}", name);
        Ok(())
    }

    async fn stop(&self, name: &str, timeout: Duration) -> Result<(), RuntimeError> {
        let options = StopContainerOptions {
            t: timeout.as_secs() as i64,
        };

        self.docker
            .stop_container(name, Some(options))
            .await
            .map_err(|e| classify(name, e))?;

        info!("Stopped container: {}", name);
        Ok(())
    }

    async fn restart(&self, name: &str, timeout: Duration) -> Result<(), RuntimeError> {
        let options = RestartContainerOptions {
            t: timeout.as_secs() as isize,
        };

        self.docker
            .restart_container(name, Some(options))
            .await
            .map_err(|e| classify(name, e))?;

        info!("Restarted container: {}", name);
        Ok(())
    }

    async fn unpause(&self, name: &str) -> Result<(), RuntimeError> {
        self.docker
            .unpause_container(name)
            .await
            .map_err(|e| classify(name, e))?;

        info!("Unpaused container: {}", name);
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };

        self.docker
            .remove_container(name, Some(options))
            .await
            .map_err(|e| classify(name, e))?;

        info!("Removed container: {}", name);
        Ok(())
    }

    async fn inspect(&self, name: &str) -> Result<Option<InstanceState>, RuntimeError> {
        match self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(info) => Ok(Some(instance_state(&info))),
            Err(e) => match classify(name, e) {
                RuntimeError::NotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }
}
