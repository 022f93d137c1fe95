// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Readiness Prober
//!
//! Polls an HTTP(S) endpoint on the loopback interface until it answers
//! with a status below 300 or the wall-clock budget is spent. Attempts are
//! spaced by a fixed interval; there is no backoff and no attempt cap.
//!
//! Certificate validation is disabled: the probe targets the instance's own
//! port on `localhost`, which rarely carries a certificate for that name.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements the start-time readiness gate

use reqwest::Client;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::domain::deployer_config::DeployerConfig;
use crate::domain::error::DeployError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct ReadinessProber {
    client: Client,
    poll_interval: Duration,
}

impl ReadinessProber {
    pub fn new(poll_interval: Duration, request_timeout: Duration) -> Result<Self, DeployError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(request_timeout)
            .build()
            .map_err(|e| DeployError::config(format!("failed to build readiness HTTP client: {}", e)))?;
        Ok(Self {
            client,
            poll_interval,
        })
    }

    pub fn from_config(config: &DeployerConfig) -> Result<Self, DeployError> {
        Self::new(config.poll_interval(), config.request_timeout())
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub async fn await_ready(&self, url: &str, timeout: Duration) -> Result<(), DeployError> {
        info!(url = %url, timeout_secs = timeout.as_secs(), "Starting readiness checks");
        let started = Instant::now();
        let mut attempt: u32 = 0;

        while started.elapsed() < timeout {
            attempt += 1;
            debug!(attempt, "Readiness check try");
            match self.client.get(url).send().await {
                Ok(response) if response.status().as_u16() < 300 => {
                    info!(attempt, status = response.status().as_u16(), "Readiness check passed");
                    return Ok(());
                }
                Ok(response) => {
                    debug!(attempt, status = response.status().as_u16(), "Workload not ready");
                }
                Err(e) => {
                    debug!(attempt, error = %e, "Readiness request failed");
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(DeployError::ReadinessTimeout {
            url: url.to_string(),
            timeout,
        })
    }
}
