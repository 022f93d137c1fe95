// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Instance Descriptor
//!
//! The declarative JSON record handed over by the host agent for one
//! workload instance. It is loaded once at process start and treated as
//! read-only afterwards; all derived values (container name, tenant alias,
//! environment) are computed from it on demand.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements the descriptor data model and custom property lookup

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Port type tag marking ports that serve HTTP and qualify for readiness probes.
pub const HTTP_PORT_TYPE: &str = "Http";

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("failed to parse instance descriptor: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("workload source '{0}' does not contain a tenant segment")]
    InvalidSource(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstanceDescriptor {
    pub component_type: String,
    pub platform: PlatformInfo,
    pub host: HostInfo,
    pub process: ProcessInfo,
    pub workload: WorkloadInfo,
    pub resource: ResourceInfo,
    pub token: TokenInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformInfo {
    pub platform_version: String,
    pub cloud_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostInfo {
    pub host_name: String,
    pub root: String,
    pub provided_package_dir: String,
    pub repository_dir: String,
    pub fqdn: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessInfo {
    /// `[key, value]` pairs declared for the workload process.
    pub environment_variables: Vec<Vec<String>>,
    pub ports: PortAllocation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortAllocation {
    pub min_dynamic: i64,
    pub max_dynamic: i64,
    pub allocated: Vec<AllocatedPort>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AllocatedPort {
    /// Declared name; the container port is the suffix after the last `_`.
    pub name: String,
    /// Host port allocated by the platform.
    pub port: i64,
    pub port_type: EnumTag,
}

impl AllocatedPort {
    pub fn is_http(&self) -> bool {
        self.port_type.value == HTTP_PORT_TYPE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnumTag {
    pub enum_class: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadInfo {
    pub application_alias: String,
    pub application_id: String,
    pub bundle_name: String,
    pub instance_id: String,
    pub provider_id: String,
    /// `/{tenant}/{app}/...`; the tenant alias is sliced out of it.
    pub source: String,
    pub version_alias: String,
    pub version_id: String,
    pub custom_props: Vec<CustomProperty>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomProperty {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceInfo {
    pub stats_polling_interval: i64,
    pub stats_publishing_interval: i64,
    pub resource_policy: ResourcePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourcePolicy {
    /// CPU shares; zero means unlimited.
    pub cpu_limit: i64,
    /// Memory limit in MB; zero means unlimited.
    pub memory_limit: i64,
    pub memory_limit_bytes: i64,
    pub name: String,
    pub version_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenInfo {
    pub tokens: BTreeMap<String, String>,
}

impl InstanceDescriptor {
    /// Parse and validate a descriptor document.
    pub fn from_json_str(json: &str) -> Result<Self, DescriptorError> {
        let descriptor: Self = serde_json::from_str(json)?;
        descriptor.tenant_alias()?;
        Ok(descriptor)
    }

    /// Engine-side name of the instance container.
    pub fn container_name(&self, prefix: &str) -> String {
        [
            prefix,
            self.workload.application_alias.as_str(),
            self.workload.version_alias.as_str(),
            self.workload.instance_id.as_str(),
        ]
        .join("-")
    }

    /// Text between the leading character of `source` and the next `/`.
    pub fn tenant_alias(&self) -> Result<&str, DescriptorError> {
        let source = self.workload.source.as_str();
        let rest = source
            .get(1..)
            .ok_or_else(|| DescriptorError::InvalidSource(source.to_string()))?;
        let end = rest
            .find('/')
            .ok_or_else(|| DescriptorError::InvalidSource(source.to_string()))?;
        Ok(&rest[..end])
    }

    /// All values of the first property named `key` that has any values.
    pub fn get_prop(&self, key: &str) -> &[String] {
        self.workload
            .custom_props
            .iter()
            .find(|prop| prop.name == key && !prop.values.is_empty())
            .map(|prop| prop.values.as_slice())
            .unwrap_or(&[])
    }

    /// First value of `key`, or the empty string when not configured.
    pub fn get_prop_first_value(&self, key: &str) -> &str {
        self.get_prop(key).first().map(String::as_str).unwrap_or("")
    }

    /// Token value, empty when the token is not defined.
    pub fn token(&self, key: &str) -> &str {
        self.token.tokens.get(key).map(String::as_str).unwrap_or("")
    }

    /// Token entries followed by declared environment variables, as `KEY=VALUE`.
    ///
    /// Duplicates are kept; the engine applies the later entry.
    pub fn environment(&self) -> Vec<String> {
        self.token
            .tokens
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .chain(
                self.process
                    .environment_variables
                    .iter()
                    .map(|pair| pair.join("=")),
            )
            .collect()
    }

    pub fn allocated_ports(&self) -> &[AllocatedPort] {
        &self.process.ports.allocated
    }

    /// First HTTP-typed port, the only one the readiness probe targets.
    pub fn first_http_port(&self) -> Option<&AllocatedPort> {
        self.allocated_ports().iter().find(|port| port.is_http())
    }
}
