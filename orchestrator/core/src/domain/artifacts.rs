// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Start-Time Artifacts
//!
//! Records consumed by processes outside the deployer once a workload is
//! running: the host supervisor reads `monitor.json` and the marker file,
//! the log forwarder reads its JSON config.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements the monitor, marker and log-forwarder records

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::instance::{InstanceDescriptor, ResourcePolicy};

pub const MARKER_FILE_NAME: &str = "apprenda-docker.properties";
pub const MONITOR_FILE_NAME: &str = "monitor.json";
pub const FORWARDER_CONFIG_FILE_NAME: &str = "logstash-forwarder-config.json";
pub const FORWARDER_PID_FILE_NAME: &str = "logstash_forwarder.pid";
pub const FORWARDER_START_SCRIPT: &str = "logstash-forwarder/bin/start-log-monitor.sh";
pub const FORWARDER_SSL_CA: &str = "logstash-forwarder/etc/apprenda-logstash2.crt";
pub const FORWARDER_LOG_TYPE: &str = "v1 stdout/sderr";

pub const TOKEN_BASEPATH: &str = "BASEPATH";
pub const TOKEN_DEPLOYER_BASEDIR: &str = "DEPLOYER_BASEDIR";
pub const TOKEN_DEPLOYER_EVENTS_BASEDIR: &str = "DEPLOYER_EVENTS_BASEDIR";

pub const START_LOG_FILE_NAME: &str = "startWorkload.out";
pub const WORKLOAD_LOG_FILE_NAME: &str = "dockerStart.out";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub pid_file_path: String,
    pub cgroup: String,
    pub launch_log_path: String,
    pub workload_log_path: String,
    pub resource_config: ResourceConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    pub stats_polling_interval: i64,
    pub stats_publishing_interval: i64,
    pub resource_policy: ResourcePolicy,
}

impl Monitor {
    pub fn for_container(
        descriptor: &InstanceDescriptor,
        container_id: &str,
        pid_file: &Path,
    ) -> Self {
        Self {
            pid_file_path: pid_file.to_string_lossy().into_owned(),
            cgroup: format!("/system.slice/docker-{}.scope", container_id),
            launch_log_path: token_path(descriptor, TOKEN_DEPLOYER_BASEDIR, START_LOG_FILE_NAME),
            workload_log_path: token_path(descriptor, TOKEN_BASEPATH, WORKLOAD_LOG_FILE_NAME),
            resource_config: ResourceConfig {
                stats_polling_interval: descriptor.resource.stats_polling_interval,
                stats_publishing_interval: descriptor.resource.stats_publishing_interval,
                resource_policy: descriptor.resource.resource_policy.clone(),
            },
        }
    }
}

/// `key=value` marker recording runtime and deployer versions.
pub fn marker_contents(engine_version: &str, deployer_version: &str) -> String {
    format!(
        "docker.version={}\ndeployer.version={}\n",
        engine_version, deployer_version
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwarderConfig {
    pub network: ForwarderNetwork,
    pub files: Vec<ForwarderFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwarderNetwork {
    pub servers: Vec<String>,
    #[serde(rename = "ssl ca")]
    pub ssl_ca: String,
    pub timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwarderFile {
    pub fields: ForwarderFields,
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwarderFields {
    pub instance_id: String,
    pub provider_id: String,
    #[serde(rename = "type")]
    pub log_type: String,
    pub version_id: String,
}

impl ForwarderConfig {
    pub fn for_container(
        descriptor: &InstanceDescriptor,
        container_log_path: &str,
        servers: Vec<String>,
        timeout_secs: u64,
    ) -> Self {
        let workload = &descriptor.workload;
        Self {
            network: ForwarderNetwork {
                servers,
                ssl_ca: Path::new(&descriptor.host.provided_package_dir)
                    .join(FORWARDER_SSL_CA)
                    .to_string_lossy()
                    .into_owned(),
                timeout: timeout_secs,
            },
            files: vec![ForwarderFile {
                fields: ForwarderFields {
                    instance_id: workload.instance_id.clone(),
                    provider_id: workload.provider_id.clone(),
                    log_type: FORWARDER_LOG_TYPE.to_string(),
                    version_id: workload.version_id.clone(),
                },
                paths: vec![container_log_path.to_string()],
            }],
        }
    }
}

/// Artifact locations derived from descriptor tokens.
///
/// A missing token resolves relative to the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub marker_files: Vec<PathBuf>,
    pub monitor_file: PathBuf,
    pub forwarder_config: PathBuf,
    pub forwarder_pid_file: PathBuf,
    pub forwarder_start_script: PathBuf,
}

impl ArtifactPaths {
    pub fn for_instance(descriptor: &InstanceDescriptor) -> Self {
        let base = Path::new(descriptor.token(TOKEN_BASEPATH));
        let events = Path::new(descriptor.token(TOKEN_DEPLOYER_EVENTS_BASEDIR));
        Self {
            marker_files: vec![base.join(MARKER_FILE_NAME), events.join(MARKER_FILE_NAME)],
            monitor_file: base.join(MONITOR_FILE_NAME),
            forwarder_config: base.join(FORWARDER_CONFIG_FILE_NAME),
            forwarder_pid_file: base.join(FORWARDER_PID_FILE_NAME),
            forwarder_start_script: Path::new(&descriptor.host.provided_package_dir)
                .join(FORWARDER_START_SCRIPT),
        }
    }
}

fn token_path(descriptor: &InstanceDescriptor, token: &str, file: &str) -> String {
    Path::new(descriptor.token(token))
        .join(file)
        .to_string_lossy()
        .into_owned()
}
