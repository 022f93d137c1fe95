// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Lifecycle verbs
//!
//! Commands: deploy, start, stop, undeploy

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use deployer_core::application::LifecycleDriver;
use deployer_core::domain::deployer_config::DeployerConfig;
use deployer_core::infrastructure::descriptor_loader::load_descriptor;
use deployer_core::infrastructure::DockerEngine;

use crate::logging::PhaseLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Deploy,
    Start,
    Stop,
    Undeploy,
}

impl Phase {
    pub fn log_file_name(self) -> &'static str {
        match self {
            Self::Deploy => "deployWorkload.out",
            Self::Start => "startWorkload.out",
            Self::Stop => "stopWorkload.out",
            Self::Undeploy => "undeployWorkload.out",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Deploy => "deploy",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Undeploy => "undeploy",
        }
    }
}

pub async fn handle_command(phase: Phase, config: DeployerConfig, log: &PhaseLog) -> Result<()> {
    let descriptor = load_descriptor(&config.instance_path).with_context(|| {
        format!("Failed to load instance descriptor {}", config.instance_path.display())
    })?;

    log.switch_to(&config.log_dir, phase.log_file_name())?;
    info!(
        phase = phase.name(),
        instance_id = %descriptor.workload.instance_id,
        "Running lifecycle phase"
    );

    let engine = DockerEngine::new(config.docker.socket_path.clone(), config.docker.timeout_secs)?;
    engine.healthcheck().await?;
    let driver = LifecycleDriver::new(Arc::new(engine), descriptor, config)?;

    match phase {
        Phase::Deploy => {
            let id = driver.deploy().await?;
            info!(container = %driver.container_name(), id = %id, "Deploy complete");
        }
        Phase::Start => driver.start().await?,
        Phase::Stop => driver.stop().await?,
        Phase::Undeploy => driver.remove().await?,
    }
    info!(phase = phase.name(), "Phase complete");
    Ok(())
}
