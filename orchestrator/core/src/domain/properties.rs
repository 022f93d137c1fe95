// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Typed Deployment Properties
//!
//! Custom properties arrive as a multi-valued, stringly-typed bag on the
//! instance descriptor. This module promotes the ones the deployer
//! understands into a typed struct in a single validated pass right after
//! the descriptor is loaded. Settings that were renamed over time are
//! resolved from an ordered list of candidate keys where the first present
//! key wins.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements the property-to-field mapping for deployments

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::warn;

use crate::domain::error::DeployError;
use crate::domain::instance::InstanceDescriptor;
use crate::domain::network::NetworkScope;

pub const PROP_IMAGE_NAME: &str = "DockerImageName";
pub const PROP_IMAGE_TAG: &str = "DockerImageTag";
pub const PROP_CMD: &str = "DockerCmd";
pub const PROP_ENTRYPOINT: &str = "DockerEntrypoint";
pub const PROP_BIND_HOST: &str = "DockerBindHost";
pub const PROP_BIND_LOCAL: &str = "DockerBindLocal";
pub const PROP_BIND_SHARED: &str = "DockerBindShared";
pub const PROP_BIND_SHARED_ROOT_DIR: &str = "DockerBindSharedRootDir";
pub const PROP_BIND_DIR_PERMISSIONS: &str = "DockerBindDirPermissions";
pub const PROP_BIND_HOST_APPROVED_DIRS: &str = "DockerBindHostApprovedDirs";
pub const PROP_NETWORK: &str = "DockerNetwork";
pub const PROP_NETWORK_SCOPE: &str = "DockerNetworkScope";
pub const PROP_FORCE_PULL: &str = "DockerForcePull";

/// Readiness settings; the `DockerHealthCheck*` names are the legacy spelling.
pub const READINESS_ENABLED_KEYS: &[&str] = &["DockerReadinessCheck", "DockerHealthCheck"];
pub const READINESS_SCHEME_KEYS: &[&str] = &["DockerReadinessCheckScheme", "DockerHealthCheckScheme"];
pub const READINESS_PATH_KEYS: &[&str] = &["DockerReadinessCheckPath", "DockerHealthCheckPath"];
pub const READINESS_TIMEOUT_KEYS: &[&str] = &[
    "DockerReadinessCheckTimeoutSecs",
    "DockerHealthCheckTimeoutSecs",
];
/// `DockerImageRemove` is the legacy spelling.
pub const REMOVE_IMAGE_KEYS: &[&str] = &["DockerRemoveImage", "DockerImageRemove"];

pub const DEFAULT_IMAGE_TAG: &str = "latest";
pub const DEFAULT_SHARED_BIND_ROOT: &str = "/apprenda/docker-binds";
pub const DEFAULT_BIND_DIR_MODE: u32 = 0o777;
pub const DEFAULT_READINESS_TIMEOUT_SECS: u64 = 300;

/// Fully-qualified image reference (`repository:tag`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeScheme {
    Http,
    Https,
}

impl ProbeScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessSettings {
    pub enabled: bool,
    pub scheme: ProbeScheme,
    /// Always starts with `/`.
    pub path: String,
    pub timeout: Duration,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            scheme: ProbeScheme::Http,
            path: "/".to_string(),
            timeout: Duration::from_secs(DEFAULT_READINESS_TIMEOUT_SECS),
        }
    }
}

impl ReadinessSettings {
    /// Probe URL for a host port on the loopback interface.
    pub fn url_for_port(&self, port: i64) -> String {
        format!("{}://localhost:{}{}", self.scheme.as_str(), port, self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BindSettings {
    pub local: Vec<String>,
    pub shared: Vec<String>,
    pub host: Vec<String>,
    /// Shared root before tenant/app/version scoping.
    pub shared_root: String,
    pub dir_mode: u32,
    /// Allowed host path prefixes; empty rejects every host bind.
    pub host_allow_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkSettings {
    /// Value of `DockerNetwork` exactly as declared.
    pub name: String,
    pub scope: Option<NetworkScope>,
}

/// Custom properties promoted to typed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployProperties {
    pub image_repository: Option<String>,
    pub image_tag: String,
    pub cmd: Option<Vec<String>>,
    pub entrypoint: Option<Vec<String>>,
    pub force_pull: bool,
    pub remove_image: bool,
    pub binds: BindSettings,
    pub network: NetworkSettings,
    pub readiness: ReadinessSettings,
}

impl DeployProperties {
    pub fn from_descriptor(descriptor: &InstanceDescriptor) -> Self {
        let first = |key: &str| descriptor.get_prop_first_value(key);
        let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());
        let fields = |value: &str| {
            non_empty(value).map(|v| v.split_whitespace().map(String::from).collect::<Vec<_>>())
        };

        let image_tag = non_empty(first(PROP_IMAGE_TAG))
            .unwrap_or_else(|| DEFAULT_IMAGE_TAG.to_string());

        let binds = BindSettings {
            local: descriptor.get_prop(PROP_BIND_LOCAL).to_vec(),
            shared: descriptor.get_prop(PROP_BIND_SHARED).to_vec(),
            host: descriptor.get_prop(PROP_BIND_HOST).to_vec(),
            shared_root: non_empty(first(PROP_BIND_SHARED_ROOT_DIR))
                .unwrap_or_else(|| DEFAULT_SHARED_BIND_ROOT.to_string()),
            dir_mode: parse_dir_mode(first(PROP_BIND_DIR_PERMISSIONS)),
            host_allow_list: first(PROP_BIND_HOST_APPROVED_DIRS)
                .split(':')
                .filter(|dir| !dir.is_empty())
                .map(String::from)
                .collect(),
        };

        let network = NetworkSettings {
            name: first(PROP_NETWORK).to_string(),
            scope: NetworkScope::parse(first(PROP_NETWORK_SCOPE)),
        };

        Self {
            image_repository: non_empty(first(PROP_IMAGE_NAME)),
            image_tag,
            cmd: fields(first(PROP_CMD)),
            entrypoint: fields(first(PROP_ENTRYPOINT)),
            force_pull: is_yes(first(PROP_FORCE_PULL)),
            remove_image: is_yes(first_present(descriptor, REMOVE_IMAGE_KEYS)),
            binds,
            network,
            readiness: readiness_settings(descriptor),
        }
    }

    /// Image reference; a missing repository is a configuration error.
    pub fn image_ref(&self) -> Result<ImageRef, DeployError> {
        let repository = self.image_repository.clone().ok_or_else(|| {
            DeployError::config(format!(
                "{} custom property must be populated with a valid registry name",
                PROP_IMAGE_NAME
            ))
        })?;
        Ok(ImageRef {
            repository,
            tag: self.image_tag.clone(),
        })
    }
}

/// First non-empty value among candidate keys, in order.
pub fn first_present<'a>(descriptor: &'a InstanceDescriptor, keys: &[&str]) -> &'a str {
    keys.iter()
        .map(|key| descriptor.get_prop_first_value(key))
        .find(|value| !value.is_empty())
        .unwrap_or("")
}

fn is_yes(value: &str) -> bool {
    value.eq_ignore_ascii_case("yes")
}

fn readiness_settings(descriptor: &InstanceDescriptor) -> ReadinessSettings {
    let scheme = match first_present(descriptor, READINESS_SCHEME_KEYS) {
        "https" => ProbeScheme::Https,
        _ => ProbeScheme::Http,
    };

    let path = match first_present(descriptor, READINESS_PATH_KEYS) {
        p if p.starts_with('/') => p.to_string(),
        _ => "/".to_string(),
    };

    // A candidate that fails to parse falls through to the next one.
    let timeout_secs = READINESS_TIMEOUT_KEYS
        .iter()
        .find_map(|key| descriptor.get_prop_first_value(key).trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_READINESS_TIMEOUT_SECS);

    ReadinessSettings {
        enabled: is_yes(first_present(descriptor, READINESS_ENABLED_KEYS)),
        scheme,
        path,
        timeout: Duration::from_secs(timeout_secs),
    }
}

/// Octal permission bits such as `0777`, `755` or `0o750`.
pub fn parse_dir_mode(raw: &str) -> u32 {
    let raw = raw.trim();
    if raw.is_empty() {
        return DEFAULT_BIND_DIR_MODE;
    }
    let digits = raw.strip_prefix("0o").unwrap_or(raw);
    match u32::from_str_radix(digits, 8) {
        Ok(mode) if mode <= 0o7777 => mode,
        _ => {
            warn!(value = %raw, "Invalid bind directory permissions, using default 0777");
            DEFAULT_BIND_DIR_MODE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instance::CustomProperty;

    fn descriptor(props: &[(&str, &str)]) -> InstanceDescriptor {
        let mut d = InstanceDescriptor::default();
        d.workload.source = "/acme/shop/v1".to_string();
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
    fn test_image_tag_defaults_to_latest() {
        let props = DeployProperties::from_descriptor(&descriptor(&[("DockerImageName", "myrepo")]));
        assert_eq!(props.image_ref().unwrap().to_string(), "myrepo:latest");
    }

    #[test]
    fn test_missing_repository_is_config_error() {
        let props = DeployProperties::from_descriptor(&descriptor(&[("DockerImageTag", "1.2")]));
        let err = props.image_ref().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_cmd_and_entrypoint_are_whitespace_split() {
        let props = DeployProperties::from_descriptor(&descriptor(&[
            ("DockerCmd", "  nginx -g   daemon off; "),
            ("DockerEntrypoint", "/docker-entrypoint.sh"),
        ]));
        assert_eq!(
            props.cmd.unwrap(),
            vec!["nginx", "-g", "daemon", "off;"]
        );
        assert_eq!(props.entrypoint.unwrap(), vec!["/docker-entrypoint.sh"]);
    }

    #[test]
    fn test_readiness_defaults() {
        let props = DeployProperties::from_descriptor(&descriptor(&[]));
        assert_eq!(props.readiness, ReadinessSettings::default());
    }

    #[test]
    fn test_readiness_prefers_current_names() {
        let props = DeployProperties::from_descriptor(&descriptor(&[
            ("DockerHealthCheck", "No"),
            ("DockerReadinessCheck", "Yes"),
            ("DockerHealthCheckPath", "/legacy"),
            ("DockerReadinessCheckPath", "/ready"),
            ("DockerReadinessCheckScheme", "https"),
        ]));
        assert!(props.readiness.enabled);
        assert_eq!(props.readiness.path, "/ready");
        assert_eq!(props.readiness.scheme, ProbeScheme::Https);
    }

    #[test]
    fn test_readiness_falls_back_to_legacy_names() {
        let props = DeployProperties::from_descriptor(&descriptor(&[
            ("DockerHealthCheck", "Yes"),
            ("DockerHealthCheckPath", "health"),
            ("DockerHealthCheckScheme", "ftp"),
            ("DockerReadinessCheckTimeoutSecs", "soon"),
            ("DockerHealthCheckTimeoutSecs", "45"),
        ]));
        assert!(props.readiness.enabled);
        // Paths without a leading slash are replaced, not prefixed.
        assert_eq!(props.readiness.path, "/");
        assert_eq!(props.readiness.scheme, ProbeScheme::Http);
        assert_eq!(props.readiness.timeout, Duration::from_secs(45));
        assert_eq!(props.readiness.url_for_port(30010), "http://localhost:30010/");
    }

    #[test]
    fn test_remove_image_candidates() {
        let legacy = DeployProperties::from_descriptor(&descriptor(&[("DockerImageRemove", "Yes")]));
        assert!(legacy.remove_image);

        let current = DeployProperties::from_descriptor(&descriptor(&[
            ("DockerRemoveImage", "No"),
            ("DockerImageRemove", "Yes"),
        ]));
        assert!(!current.remove_image);
    }

    #[test]
    fn test_parse_dir_mode() {
        assert_eq!(parse_dir_mode(""), 0o777);
        assert_eq!(parse_dir_mode("0755"), 0o755);
        assert_eq!(parse_dir_mode("750"), 0o750);
        assert_eq!(parse_dir_mode("0o700"), 0o700);
        assert_eq!(parse_dir_mode("rwx"), 0o777);
        assert_eq!(parse_dir_mode("999"), 0o777);
    }

    #[test]
    fn test_host_allow_list_split() {
        let props = DeployProperties::from_descriptor(&descriptor(&[(
            "DockerBindHostApprovedDirs",
            "/data:/var/log",
        )]));
        assert_eq!(props.binds.host_allow_list, vec!["/data", "/var/log"]);
        assert_eq!(props.binds.shared_root, DEFAULT_SHARED_BIND_ROOT);
        assert_eq!(props.binds.dir_mode, 0o777);
    }
}
