// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Monitor Artifacts
//!
//! Written once a started workload has passed its readiness gate: the
//! container PID file, the version marker files and `monitor.json`.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Hands the running container over to the host supervisor

use std::path::Path;
use tracing::info;

use crate::domain::artifacts::{marker_contents, ArtifactPaths, Monitor};
use crate::domain::deployer_config::WORKLOAD_PID_FILE_ENV;
use crate::domain::engine::ContainerDetails;
use crate::domain::error::DeployError;
use crate::domain::instance::InstanceDescriptor;

pub fn write_monitor_artifacts(
    descriptor: &InstanceDescriptor,
    container: &ContainerDetails,
    engine_version: &str,
    pid_file: Option<&Path>,
) -> Result<(), DeployError> {
    let pid_file = pid_file.ok_or_else(|| {
        DeployError::config(format!("${} environment variable not defined", WORKLOAD_PID_FILE_ENV))
    })?;
    let paths = ArtifactPaths::for_instance(descriptor);
    let monitor = Monitor::for_container(descriptor, &container.id, pid_file);
    let monitor_json = serde_json::to_string_pretty(&monitor)?;

    write_file(pid_file, container.pid.to_string().as_bytes())?;
    info!(path = %pid_file.display(), pid = container.pid, "Created container PID file");

    let marker = marker_contents(engine_version, env!("CARGO_PKG_VERSION"));
    for marker_file in &paths.marker_files {
        write_file(marker_file, marker.as_bytes())?;
    }
    info!("Created marker files");

    write_file(&paths.monitor_file, monitor_json.as_bytes())?;
    info!(path = %paths.monitor_file.display(), "Created workload monitor file");
    Ok(())
}

pub(crate) fn write_file(path: &Path, contents: &[u8]) -> Result<(), DeployError> {
    std::fs::write(path, contents).map_err(|e| DeployError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artifacts::{TOKEN_BASEPATH, TOKEN_DEPLOYER_EVENTS_BASEDIR};
    use crate::domain::engine::ContainerStatus;
    use tempfile::TempDir;

    fn container() -> ContainerDetails {
        ContainerDetails {
            id: "c0ffee".to_string(),
            name: "apprenda-shop-v1-i1".to_string(),
            status: ContainerStatus::Running,
            pid: 4242,
            log_path: "/var/lib/docker/containers/c0ffee/c0ffee-json.log".to_string(),
        }
    }

    #[test]
    fn test_missing_pid_file_is_config_error() {
        let descriptor = InstanceDescriptor::default();
        let err = write_monitor_artifacts(&descriptor, &container(), "24.0.7", None).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_writes_all_artifacts() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("base");
        let events = tmp.path().join("events");
        std::fs::create_dir_all(&base).unwrap();
        std::fs::create_dir_all(&events).unwrap();

        let mut descriptor = InstanceDescriptor::default();
        descriptor.token.tokens.insert(TOKEN_BASEPATH.into(), base.to_string_lossy().into());
        descriptor
            .token
            .tokens
            .insert(TOKEN_DEPLOYER_EVENTS_BASEDIR.into(), events.to_string_lossy().into());

        let pid_file = tmp.path().join("workload.pid");
        write_monitor_artifacts(&descriptor, &container(), "24.0.7", Some(&pid_file)).unwrap();

        assert_eq!(std::fs::read_to_string(&pid_file).unwrap(), "4242");
        let marker = std::fs::read_to_string(events.join("apprenda-docker.properties")).unwrap();
        assert!(marker.starts_with("docker.version=24.0.7\n"));
        assert!(base.join("apprenda-docker.properties").exists());

        let monitor: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(base.join("monitor.json")).unwrap()).unwrap();
        assert_eq!(monitor["cgroup"], "/system.slice/docker-c0ffee.scope");
    }
}
