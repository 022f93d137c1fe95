// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::domain::network::NetworkAttachment;
use crate::domain::ports::PortMap;

/// Error signals the lifecycle logic branches on.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("image not found locally: {0}")]
    ImageNotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("in use: {0}")]
    InUse(String),
    #[error("failed to connect to container engine: {0}")]
    Connection(String),
    #[error("{0}")]
    Api(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub memory_bytes: Option<i64>,
    pub cpu_shares: Option<i64>,
}

/// Everything the engine needs to create the instance container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub name: String,
    pub image: String,
    pub ports: PortMap,
    pub env: Vec<String>,
    pub cmd: Option<Vec<String>>,
    pub entrypoint: Option<Vec<String>>,
    pub resources: ResourceLimits,
    /// `hostPath:containerPath[:options]` entries.
    pub binds: Vec<String>,
    /// Network mode; the scoped network name or the unscoped configured name.
    pub network_mode: Option<String>,
    /// Endpoint settings when a network scope is configured.
    pub network: Option<NetworkAttachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDetails {
    pub id: String,
    pub name: String,
    pub status: ContainerStatus,
    pub pid: i64,
    pub log_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkOptions {
    pub driver: String,
    pub attachable: bool,
    pub check_duplicate: bool,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            driver: "overlay".to_string(),
            attachable: true,
            check_duplicate: true,
        }
    }
}

/// The container runtime verbs the deployer depends on.
///
/// Implemented by the Docker adapter in production and by in-memory fakes
/// in tests.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Create a container; returns its ID. Fails with `ImageNotFound` when
    /// the image is not present locally.
    async fn create_container(&self, spec: &LaunchSpec) -> Result<String, EngineError>;

    async fn start_container(&self, id: &str) -> Result<(), EngineError>;

    async fn stop_container(&self, id: &str, timeout: Duration) -> Result<(), EngineError>;

    /// Force-remove a container, optionally with its anonymous volumes.
    async fn remove_container(&self, id: &str, remove_volumes: bool) -> Result<(), EngineError>;

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, EngineError>;

    async fn pull_image(&self, reference: &str) -> Result<(), EngineError>;

    /// Fails with `InUse` when other containers still reference the image.
    async fn remove_image(&self, reference: &str, prune_children: bool) -> Result<(), EngineError>;

    /// Names of all networks known to the engine.
    async fn list_networks(&self) -> Result<Vec<String>, EngineError>;

    async fn create_network(&self, name: &str, options: &NetworkOptions) -> Result<(), EngineError>;

    async fn remove_network(&self, name: &str) -> Result<(), EngineError>;

    async fn server_version(&self) -> Result<String, EngineError>;
}
