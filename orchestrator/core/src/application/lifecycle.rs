// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lifecycle Driver
//!
//! The four phase operations run by one deployer invocation:
//!
//! - **deploy**: resolve binds and network, build the launch spec, create
//! - **start**: start, inspect, readiness gate, monitor artifacts, log forwarder
//! - **stop**: bounded graceful stop, then kill the log forwarder
//! - **remove**: force-remove container and volumes, best-effort network
//!   and image cleanup
//!
//! No state object survives between invocations. Every operation
//! reconstructs the current [`LifecycleState`] from the engine first.
//!
//! No operation rolls back on failure. A process killed part-way can leave
//! a created container that was never started, or a running container
//! without monitor artifacts; the next invocation sees whatever the engine
//! reports.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Sequences resolvers and engine calls per phase

use std::sync::Arc;
use tracing::{info, warn};

use crate::application::bind_resolver::resolve_binds;
use crate::application::launch_builder::{build_launch_spec, create_container};
use crate::application::log_forwarder::{start_log_forwarder, stop_log_forwarder};
use crate::application::monitor::write_monitor_artifacts;
use crate::application::network_resolver::{ensure_network, resolve_network};
use crate::application::readiness::ReadinessProber;
use crate::domain::deployer_config::DeployerConfig;
use crate::domain::engine::{ContainerDetails, ContainerEngine, EngineError};
use crate::domain::error::DeployError;
use crate::domain::instance::InstanceDescriptor;
use crate::domain::lifecycle::LifecycleState;
use crate::domain::properties::DeployProperties;

/// Which start-time handoffs run after the readiness gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartHandoff {
    pub monitor_artifacts: bool,
    pub log_forwarder: bool,
}

impl Default for StartHandoff {
    fn default() -> Self {
        Self {
            monitor_artifacts: true,
            log_forwarder: true,
        }
    }
}

pub struct LifecycleDriver {
    engine: Arc<dyn ContainerEngine>,
    descriptor: InstanceDescriptor,
    props: DeployProperties,
    config: DeployerConfig,
    prober: ReadinessProber,
    handoff: StartHandoff,
}

impl LifecycleDriver {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        descriptor: InstanceDescriptor,
        config: DeployerConfig,
    ) -> Result<Self, DeployError> {
        let props = DeployProperties::from_descriptor(&descriptor);
        let prober = ReadinessProber::from_config(&config)?;
        Ok(Self {
            engine,
            descriptor,
            props,
            config,
            prober,
            handoff: StartHandoff::default(),
        })
    }

    pub fn with_handoff(mut self, handoff: StartHandoff) -> Self {
        self.handoff = handoff;
        self
    }

    pub fn container_name(&self) -> String {
        self.descriptor.container_name(&self.config.container_name_prefix)
    }

    pub fn properties(&self) -> &DeployProperties {
        &self.props
    }

    async fn inspect(&self) -> Result<Option<ContainerDetails>, DeployError> {
        match self.engine.inspect_container(&self.container_name()).await {
            Ok(details) => Ok(Some(details)),
            Err(EngineError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Current state as reported by the engine.
    pub async fn current_state(&self) -> Result<LifecycleState, DeployError> {
        Ok(LifecycleState::from_details(self.inspect().await?.as_ref()))
    }

    fn invalid(&self, state: LifecycleState, operation: &'static str) -> DeployError {
        DeployError::InvalidTransition {
            name: self.container_name(),
            state,
            operation,
        }
    }

    fn not_found(&self) -> DeployError {
        DeployError::Engine(EngineError::NotFound(format!(
            "no such container: {}",
            self.container_name()
        )))
    }

    /// absent → created. Returns the new container ID.
    pub async fn deploy(&self) -> Result<String, DeployError> {
        let state = self.current_state().await?;
        if !state.can_deploy() {
            return Err(self.invalid(state, "deploy"));
        }

        // Fail on a missing image repository before touching the filesystem.
        self.props.image_ref()?;

        let binds = resolve_binds(&self.descriptor, &self.props, self.config.binds.copy_policy)?;
        let placement = resolve_network(&self.descriptor, &self.props)?;
        if let Some(attachment) = &placement.attachment {
            ensure_network(self.engine.as_ref(), &attachment.name).await?;
        }

        let spec = build_launch_spec(
            &self.descriptor,
            &self.props,
            self.container_name(),
            binds.engine_specs(),
            placement,
        )?;
        create_container(self.engine.as_ref(), &spec, self.props.force_pull).await
    }

    /// created|stopped → running.
    ///
    /// A readiness failure leaves the container running and fails the
    /// operation.
    pub async fn start(&self) -> Result<(), DeployError> {
        let state = self.current_state().await?;
        match state {
            LifecycleState::Absent => return Err(self.not_found()),
            s if !s.can_start() => return Err(self.invalid(s, "start")),
            _ => {}
        }

        let name = self.container_name();
        self.engine.start_container(&name).await?;
        info!(container = %name, "Container started");

        let details = self.engine.inspect_container(&name).await?;
        let engine_version = self.engine.server_version().await?;

        self.await_readiness().await?;

        if self.handoff.monitor_artifacts {
            write_monitor_artifacts(
                &self.descriptor,
                &details,
                &engine_version,
                self.config.workload_pid_file.as_deref(),
            )?;
        }
        if self.handoff.log_forwarder {
            start_log_forwarder(&self.descriptor, &details, &self.config.log_forwarder).await?;
        }
        Ok(())
    }

    /// Probe the first HTTP-typed port when readiness checks are enabled.
    async fn await_readiness(&self) -> Result<(), DeployError> {
        let readiness = &self.props.readiness;
        if !readiness.enabled {
            return Ok(());
        }
        let Some(port) = self.descriptor.first_http_port() else {
            info!("Readiness check enabled but no HTTP port allocated; skipping");
            return Ok(());
        };
        let url = readiness.url_for_port(port.port);
        self.prober.await_ready(&url, readiness.timeout).await
    }

    /// running → stopped.
    pub async fn stop(&self) -> Result<(), DeployError> {
        let state = self.current_state().await?;
        match state {
            LifecycleState::Absent => return Err(self.not_found()),
            s if !s.can_stop() => {
                info!(container = %self.container_name(), state = %s, "Container is not running; nothing to stop");
                return Ok(());
            }
            _ => {}
        }

        let name = self.container_name();
        self.engine
            .stop_container(&name, self.config.stop_timeout())
            .await?;
        info!(container = %name, "Container stopped");

        if self.handoff.log_forwarder {
            stop_log_forwarder(&self.descriptor)?;
        }
        Ok(())
    }

    /// any → absent. Network and image cleanup never fail the operation.
    pub async fn remove(&self) -> Result<(), DeployError> {
        let state = self.current_state().await?;
        let name = self.container_name();

        if state == LifecycleState::Absent {
            info!(container = %name, "Container already absent");
        } else {
            match self.engine.remove_container(&name, true).await {
                Ok(()) => info!(container = %name, "Container removed"),
                Err(EngineError::NotFound(_)) => info!(container = %name, "Container already absent"),
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(attachment) = resolve_network(&self.descriptor, &self.props)?.attachment {
            if let Err(e) = self.engine.remove_network(&attachment.name).await {
                warn!(network = %attachment.name, error = %e, "Network not removed");
            } else {
                info!(network = %attachment.name, "Network removed");
            }
        }

        if self.props.remove_image {
            self.remove_image().await?;
        }
        Ok(())
    }

    async fn remove_image(&self) -> Result<(), DeployError> {
        let image = self.props.image_ref()?.to_string();
        match self.engine.remove_image(&image, true).await {
            Ok(()) => info!(image = %image, "Image removed"),
            Err(EngineError::InUse(_)) => {
                info!(image = %image, "Image not removed because other containers are still using it")
            }
            Err(e) => warn!(image = %image, error = %e, "Image not removed"),
        }
        Ok(())
    }
}
