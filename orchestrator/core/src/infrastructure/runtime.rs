// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::engine::{
    ContainerDetails, ContainerEngine, ContainerStatus, EngineError, LaunchSpec, NetworkOptions,
};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, NetworkingConfig,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::{CreateImageOptions, RemoveImageOptions};
use bollard::models::{ContainerStateStatusEnum, EndpointSettings, HostConfig, PortBinding};
use bollard::network::{CreateNetworkOptions, ListNetworksOptions};
use bollard::Docker;
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    pub fn new(socket_path: Option<String>, timeout_secs: u64) -> Result<Self, EngineError> {
        // Connect to Docker daemon (custom socket or auto-detect)
        let docker = if let Some(path) = socket_path {
            Docker::connect_with_unix(&path, timeout_secs, bollard::API_DEFAULT_VERSION)
                .map_err(|e| EngineError::Connection(format!(
                    "Failed to connect to Docker at {}: {}\n\n\
                     Ensure Docker is running and the socket path is correct.",
                    path, e
                )))?
        } else {
            Docker::connect_with_local_defaults()
                .map_err(|e| EngineError::Connection(format!(
                    "Failed to connect to Docker: {}\n\n\
                     Common causes:\n\
                     - Docker daemon not running (check: docker ps)\n\
                     - Permission denied accessing Docker socket\n\
                     - Current user not in 'docker' group",
                    e
                )))?
                .with_timeout(Duration::from_secs(timeout_secs))
        };

        Ok(Self { docker })
    }

    /// Verify Docker daemon is accessible
    pub async fn healthcheck(&self) -> Result<(), EngineError> {
        self.docker.ping().await
            .map_err(|e| EngineError::Connection(format!(
                "Cannot connect to Docker daemon: {}\n\nVerify with: docker ps",
                e
            )))?;
        Ok(())
    }

    fn container_config(spec: &LaunchSpec) -> Config<String> {
        let exposed_ports: HashMap<String, HashMap<(), ()>> = spec
            .ports
            .exposed
            .iter()
            .map(|port| (port.clone(), HashMap::new()))
            .collect();

        let port_bindings: HashMap<String, Option<Vec<PortBinding>>> = spec
            .ports
            .bindings
            .iter()
            .map(|(port, bindings)| {
                let bindings = bindings
                    .iter()
                    .map(|b| PortBinding {
                        host_ip: Some(b.host_ip.clone()),
                        host_port: Some(b.host_port.clone()),
                    })
                    .collect();
                (port.clone(), Some(bindings))
            })
            .collect();

        let host_config = HostConfig {
            binds: Some(spec.binds.clone()),
            port_bindings: Some(port_bindings),
            memory: spec.resources.memory_bytes,
            cpu_shares: spec.resources.cpu_shares,
            network_mode: spec.network_mode.clone(),
            ..Default::default()
        };

        let networking_config = spec.network.as_ref().map(|network| NetworkingConfig {
            endpoints_config: HashMap::from([(
                network.name.clone(),
                EndpointSettings {
                    aliases: Some(vec![network.alias.clone()]),
                    network_id: Some(network.name.clone()),
                    ..Default::default()
                },
            )]),
        });

        Config {
            image: Some(spec.image.clone()),
            exposed_ports: Some(exposed_ports),
            env: Some(spec.env.clone()),
            cmd: spec.cmd.clone(),
            entrypoint: spec.entrypoint.clone(),
            attach_stdin: Some(false),
            attach_stdout: Some(false),
            attach_stderr: Some(false),
            tty: Some(false),
            host_config: Some(host_config),
            networking_config,
            ..Default::default()
        }
    }
}

/// Map engine API failures onto the signals the lifecycle logic understands.
fn map_error(err: BollardError) -> EngineError {
    match err {
        BollardError::DockerResponseServerError { status_code: 404, message } => {
            EngineError::NotFound(message)
        }
        BollardError::DockerResponseServerError { status_code: 409, message } => {
            EngineError::AlreadyExists(message)
        }
        other => EngineError::Api(other.to_string()),
    }
}

fn status_from(status: Option<ContainerStateStatusEnum>) -> ContainerStatus {
    match status {
        Some(ContainerStateStatusEnum::CREATED) => ContainerStatus::Created,
        Some(ContainerStateStatusEnum::RUNNING) => ContainerStatus::Running,
        Some(ContainerStateStatusEnum::PAUSED) => ContainerStatus::Paused,
        Some(ContainerStateStatusEnum::RESTARTING) => ContainerStatus::Restarting,
        Some(ContainerStateStatusEnum::REMOVING) => ContainerStatus::Removing,
        Some(ContainerStateStatusEnum::EXITED) => ContainerStatus::Exited,
        _ => ContainerStatus::Dead,
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn create_container(&self, spec: &LaunchSpec) -> Result<String, EngineError> {
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let res = self
            .docker
            .create_container(Some(options), Self::container_config(spec))
            .await
            .map_err(|e| match e {
                BollardError::DockerResponseServerError { status_code: 404, message }
                    if message.to_lowercase().contains("image") =>
                {
                    EngineError::ImageNotFound(message)
                }
                other => map_error(other),
            })?;

        for warning in &res.warnings {
            debug!(container = %spec.name, "Engine warning on create: {}", warning);
        }
        Ok(res.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(map_error)
    }

    async fn stop_container(&self, id: &str, timeout: Duration) -> Result<(), EngineError> {
        let options = StopContainerOptions {
            t: timeout.as_secs() as i64,
        };
        match self.docker.stop_container(id, Some(options)).await {
            Ok(()) => Ok(()),
            // Already stopped
            Err(BollardError::DockerResponseServerError { status_code: 304, .. }) => Ok(()),
            Err(e) => Err(map_error(e)),
        }
    }

    async fn remove_container(&self, id: &str, remove_volumes: bool) -> Result<(), EngineError> {
        let options = RemoveContainerOptions {
            v: remove_volumes,
            force: true,
            ..Default::default()
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(map_error)
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, EngineError> {
        let inspect = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(map_error)?;

        let state = inspect.state.unwrap_or_default();
        Ok(ContainerDetails {
            id: inspect.id.unwrap_or_default(),
            name: inspect
                .name
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_else(|| id.to_string()),
            status: status_from(state.status),
            pid: state.pid.unwrap_or_default(),
            log_path: inspect.log_path.unwrap_or_default(),
        })
    }

    async fn pull_image(&self, reference: &str) -> Result<(), EngineError> {
        info!("Pulling {:?} from the registry...", reference);
        let options = Some(CreateImageOptions {
            from_image: reference.to_string(),
            ..Default::default()
        });

        let mut stream = self.docker.create_image(options, None, None);
        while let Some(result) = stream.next().await {
            let progress = result.map_err(|e| {
                EngineError::Api(format!(
                    "Failed to pull image {}: {}\n\n\
                     Common causes:\n\
                     - No connectivity to the registry\n\
                     - Image name is incorrect or doesn't exist\n\
                     - Registry authentication required\n\n\
                     Try manually: docker pull {}",
                    reference, e, reference
                ))
            })?;
            if let Some(status) = progress.status {
                debug!(image = %reference, "{}", status);
            }
        }
        info!("Image pull complete: {}", reference);
        Ok(())
    }

    async fn remove_image(&self, reference: &str, prune_children: bool) -> Result<(), EngineError> {
        let options = RemoveImageOptions {
            noprune: !prune_children,
            ..Default::default()
        };
        self.docker
            .remove_image(reference, Some(options), None)
            .await
            .map(|_| ())
            .map_err(|e| match e {
                BollardError::DockerResponseServerError { status_code: 409, message } => {
                    EngineError::InUse(message)
                }
                other => map_error(other),
            })
    }

    async fn list_networks(&self) -> Result<Vec<String>, EngineError> {
        let networks = self
            .docker
            .list_networks(None::<ListNetworksOptions<String>>)
            .await
            .map_err(map_error)?;
        Ok(networks.into_iter().filter_map(|n| n.name).collect())
    }

    async fn create_network(&self, name: &str, options: &NetworkOptions) -> Result<(), EngineError> {
        let config = CreateNetworkOptions {
            name: name.to_string(),
            check_duplicate: options.check_duplicate,
            driver: options.driver.clone(),
            attachable: options.attachable,
            ..Default::default()
        };
        self.docker
            .create_network(config)
            .await
            .map(|_| ())
            .map_err(map_error)
    }

    async fn remove_network(&self, name: &str) -> Result<(), EngineError> {
        self.docker.remove_network(name).await.map_err(map_error)
    }

    async fn server_version(&self) -> Result<String, EngineError> {
        let version = self.docker.version().await.map_err(map_error)?;
        Ok(version.version.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::network::NetworkAttachment;
    use crate::domain::ports::parse_port_specs;

    fn spec() -> LaunchSpec {
        LaunchSpec {
            name: "apprenda-shop-v1-i1".to_string(),
            image: "myrepo:latest".to_string(),
            ports: parse_port_specs(&["30010:8080"]).unwrap(),
            env: vec!["A=1".to_string()],
            cmd: None,
            entrypoint: Some(vec!["/bin/run".to_string()]),
            resources: Default::default(),
            binds: vec!["/srv/data:/data".to_string()],
            network_mode: Some("tenant-acme-net".to_string()),
            network: Some(NetworkAttachment {
                name: "tenant-acme-net".to_string(),
                alias: "shop-v1-web".to_string(),
            }),
        }
    }

    #[test]
    fn test_container_config_translation() {
        let config = DockerEngine::container_config(&spec());
        assert_eq!(config.image.as_deref(), Some("myrepo:latest"));
        assert!(config.exposed_ports.unwrap().contains_key("8080/tcp"));

        let host = config.host_config.unwrap();
        let bindings = host.port_bindings.unwrap();
        let binding = &bindings["8080/tcp"].as_ref().unwrap()[0];
        assert_eq!(binding.host_port.as_deref(), Some("30010"));
        assert_eq!(host.network_mode.as_deref(), Some("tenant-acme-net"));
        assert_eq!(host.memory, None);

        let endpoints = config.networking_config.unwrap().endpoints_config;
        let endpoint = &endpoints["tenant-acme-net"];
        assert_eq!(endpoint.aliases, Some(vec!["shop-v1-web".to_string()]));
    }

    #[test]
    fn test_error_mapping() {
        let not_found = BollardError::DockerResponseServerError {
            status_code: 404,
            message: "no such container".to_string(),
        };
        assert!(matches!(map_error(not_found), EngineError::NotFound(_)));

        let conflict = BollardError::DockerResponseServerError {
            status_code: 409,
            message: "network with name x already exists".to_string(),
        };
        assert!(matches!(map_error(conflict), EngineError::AlreadyExists(_)));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_from(Some(ContainerStateStatusEnum::RUNNING)), ContainerStatus::Running);
        assert_eq!(status_from(None), ContainerStatus::Dead);
    }
}
