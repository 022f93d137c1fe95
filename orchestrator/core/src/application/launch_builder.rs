// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Launch Spec Builder
//!
//! Composes the image reference, ports, environment, command overrides,
//! resource limits, binds and network placement into one [`LaunchSpec`] and
//! creates the container from it.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements launch spec assembly and container creation
//! - **Integration:** BindResolution + NetworkPlacement → LaunchSpec → ContainerEngine

use tracing::{info, warn};

use crate::application::network_resolver::NetworkPlacement;
use crate::domain::engine::{ContainerEngine, EngineError, LaunchSpec, ResourceLimits};
use crate::domain::error::DeployError;
use crate::domain::instance::{InstanceDescriptor, ResourcePolicy};
use crate::domain::ports::port_map_for;
use crate::domain::properties::DeployProperties;

const BYTES_PER_MB: i64 = 1024 * 1024;

pub fn build_launch_spec(
    descriptor: &InstanceDescriptor,
    props: &DeployProperties,
    container_name: String,
    binds: Vec<String>,
    placement: NetworkPlacement,
) -> Result<LaunchSpec, DeployError> {
    let image = props.image_ref()?;
    let ports = port_map_for(descriptor.allocated_ports())?;

    Ok(LaunchSpec {
        name: container_name,
        image: image.to_string(),
        ports,
        env: descriptor.environment(),
        cmd: props.cmd.clone(),
        entrypoint: props.entrypoint.clone(),
        resources: resource_limits(&descriptor.resource.resource_policy)?,
        binds,
        network_mode: placement.network_mode,
        network: placement.attachment,
    })
}

/// Zero (or negative) limits mean unlimited and are left unset.
pub fn resource_limits(policy: &ResourcePolicy) -> Result<ResourceLimits, DeployError> {
    let memory_bytes = if policy.memory_limit > 0 {
        let bytes = policy.memory_limit.checked_mul(BYTES_PER_MB).ok_or_else(|| {
            DeployError::config(format!(
                "memory limit of {} MB is out of range",
                policy.memory_limit
            ))
        })?;
        Some(bytes)
    } else {
        None
    };
    Ok(ResourceLimits {
        memory_bytes,
        cpu_shares: (policy.cpu_limit > 0).then_some(policy.cpu_limit),
    })
}

/// Create the container, pulling first when `force_pull` is set.
///
/// An image missing locally is pulled and the create retried exactly once;
/// any other failure, or a second failure, is returned as is.
pub async fn create_container(
    engine: &dyn ContainerEngine,
    spec: &LaunchSpec,
    force_pull: bool,
) -> Result<String, DeployError> {
    if force_pull {
        info!(image = %spec.image, "Forcing an image pull");
        engine.pull_image(&spec.image).await?;
    }

    let id = match engine.create_container(spec).await {
        Ok(id) => id,
        Err(EngineError::ImageNotFound(message)) => {
            warn!(image = %spec.image, "Image not found locally, trying to pull it: {}", message);
            engine.pull_image(&spec.image).await?;
            engine.create_container(spec).await?
        }
        Err(e) => return Err(e.into()),
    };

    info!(container = %spec.name, id = %id, image = %spec.image, "Container created");
    Ok(id)
}
