// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Log Forwarder Handoff
//!
//! The forwarder is an external process shipped with the host package. On
//! start the deployer writes its JSON config and runs the package's start
//! script; on stop it reads the forwarder's PID file and kills it.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Starts and stops the container log forwarder

use std::path::Path;
use tokio::process::Command;
use tracing::info;

use crate::application::monitor::write_file;
use crate::domain::artifacts::{ArtifactPaths, ForwarderConfig};
use crate::domain::deployer_config::LogForwarderConfig;
use crate::domain::engine::ContainerDetails;
use crate::domain::error::DeployError;
use crate::domain::instance::InstanceDescriptor;

pub async fn start_log_forwarder(
    descriptor: &InstanceDescriptor,
    container: &ContainerDetails,
    settings: &LogForwarderConfig,
) -> Result<(), DeployError> {
    let paths = ArtifactPaths::for_instance(descriptor);
    let config = ForwarderConfig::for_container(
        descriptor,
        &container.log_path,
        settings.servers.clone(),
        settings.timeout_secs,
    );
    write_file(&paths.forwarder_config, serde_json::to_string_pretty(&config)?.as_bytes())?;
    info!(path = %paths.forwarder_config.display(), "Created log forwarder config");

    run_start_script(&paths.forwarder_start_script, &paths.forwarder_config).await?;
    info!("Started log forwarder");
    Ok(())
}

async fn run_start_script(script: &Path, config_path: &Path) -> Result<(), DeployError> {
    let status = Command::new(script)
        .arg(config_path)
        .status()
        .await
        .map_err(|e| DeployError::io(script, e))?;
    if !status.success() {
        return Err(DeployError::LogForwarder(format!(
            "{} exited with {}",
            script.display(),
            status
        )));
    }
    Ok(())
}

pub fn stop_log_forwarder(descriptor: &InstanceDescriptor) -> Result<(), DeployError> {
    let pid_file = ArtifactPaths::for_instance(descriptor).forwarder_pid_file;
    let raw = std::fs::read_to_string(&pid_file).map_err(|e| DeployError::io(&pid_file, e))?;
    let pid: libc::pid_t = raw.trim().parse().map_err(|_| {
        DeployError::LogForwarder(format!("invalid pid '{}' in {}", raw.trim(), pid_file.display()))
    })?;
    if pid <= 0 {
        return Err(DeployError::LogForwarder(format!(
            "refusing to signal pid {} from {}",
            pid,
            pid_file.display()
        )));
    }

    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(pid, libc::SIGKILL) };
    if rc != 0 {
        return Err(DeployError::LogForwarder(format!(
            "failed to kill forwarder pid {}: {}",
            pid,
            std::io::Error::last_os_error()
        )));
    }
    info!(pid, "Stopped log forwarder");
    Ok(())
}
