// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Network Scope Resolver
//!
//! Derives the network the instance container joins and makes sure it
//! exists before the container is created.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements network placement and idempotent network creation

use tracing::info;

use crate::domain::engine::{ContainerEngine, EngineError, NetworkOptions};
use crate::domain::error::DeployError;
use crate::domain::instance::InstanceDescriptor;
use crate::domain::network::{NetworkAttachment, NetworkIdentity};
use crate::domain::properties::DeployProperties;

/// Where the container is attached.
///
/// Without a scope the configured name (if any) is used as network mode and
/// no endpoint settings are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkPlacement {
    pub network_mode: Option<String>,
    pub attachment: Option<NetworkAttachment>,
}

pub fn resolve_network(
    descriptor: &InstanceDescriptor,
    props: &DeployProperties,
) -> Result<NetworkPlacement, DeployError> {
    let configured = props.network.name.as_str();
    let Some(scope) = props.network.scope else {
        return Ok(NetworkPlacement {
            network_mode: (!configured.is_empty()).then(|| configured.to_string()),
            attachment: None,
        });
    };

    let workload = &descriptor.workload;
    let identity = NetworkIdentity {
        tenant: descriptor.tenant_alias()?,
        app_alias: &workload.application_alias,
        version_alias: &workload.version_alias,
        bundle_name: &workload.bundle_name,
        configured_name: configured,
    };
    let attachment = identity.attachment(scope);
    info!(scope = %scope, network = %attachment.name, alias = %attachment.alias, "Resolved network placement");

    Ok(NetworkPlacement {
        network_mode: Some(attachment.name.clone()),
        attachment: Some(attachment),
    })
}

/// Create the network unless it is already listed. A concurrent creator
/// winning the race surfaces as `AlreadyExists`, which counts as success.
pub async fn ensure_network(engine: &dyn ContainerEngine, name: &str) -> Result<(), DeployError> {
    let networks = engine.list_networks().await?;
    if networks.iter().any(|existing| existing == name) {
        info!(network = %name, "Network already exists");
        return Ok(());
    }

    match engine.create_network(name, &NetworkOptions::default()).await {
        Ok(()) => {
            info!(network = %name, "Successfully created network");
            Ok(())
        }
        Err(EngineError::AlreadyExists(message)) => {
            info!(network = %name, "Network created concurrently: {}", message);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instance::CustomProperty;

    fn descriptor(props: &[(&str, &str)]) -> InstanceDescriptor {
        let mut d = InstanceDescriptor::default();
        d.workload.source = "/acme/shop/v1".to_string();
        d.workload.application_alias = "shop".to_string();
        d.workload.version_alias = "v1".to_string();
        d.workload.bundle_name = "web".to_string();
        d.workload.custom_props = props
            .iter()
            .map(|(name, value)| CustomProperty {
                name: name.to_string(),
                values: vec![value.to_string()],
            })
            .collect();
        d
    }

    #[test]
    fn test_tenant_scope_placement() {
        let d = descriptor(&[("DockerNetworkScope", "tenant"), ("DockerNetwork", "shared-net")]);
        let props = DeployProperties::from_descriptor(&d);
        let placement = resolve_network(&d, &props).unwrap();
        assert_eq!(placement.network_mode.as_deref(), Some("tenant-acme-shared-net"));
        let attachment = placement.attachment.unwrap();
        assert_eq!(attachment.alias, "shop-v1-web");
    }

    #[test]
    fn test_unscoped_network_passes_name_through() {
        let d = descriptor(&[("DockerNetwork", "Bridge-Net")]);
        let props = DeployProperties::from_descriptor(&d);
        let placement = resolve_network(&d, &props).unwrap();
        assert_eq!(placement.network_mode.as_deref(), Some("Bridge-Net"));
        assert!(placement.attachment.is_none());
    }

    #[test]
    fn test_no_network_configured() {
        let d = descriptor(&[]);
        let props = DeployProperties::from_descriptor(&d);
        assert_eq!(resolve_network(&d, &props).unwrap(), NetworkPlacement::default());
    }
}
