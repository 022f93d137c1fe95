// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Deployment Error Taxonomy
//!
//! Every resolver and lifecycle operation returns a single
//! `Result<_, DeployError>`. The variants separate configuration problems
//! (never retried), engine failures, readiness timeouts and local I/O.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements the error classes surfaced at the process boundary

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::domain::engine::EngineError;
use crate::domain::instance::DescriptorError;
use crate::domain::lifecycle::LifecycleState;

#[derive(Debug, Error)]
pub enum DeployError {
    /// Missing mandatory property, malformed value, disallowed path.
    #[error("ABORT: {0}")]
    Config(String),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("container engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("ABORT: readiness check on {url} timed out after {timeout:?}")]
    ReadinessTimeout { url: String, timeout: Duration },

    #[error("container '{name}' is {state}; cannot {operation}")]
    InvalidTransition {
        name: String,
        state: LifecycleState,
        operation: &'static str,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy archive content from {source_dir}: {failures} entries failed, first: {first}")]
    Copy {
        source_dir: PathBuf,
        failures: usize,
        first: String,
    },

    #[error("log forwarder error: {0}")]
    LogForwarder(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DeployError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that stem from operator-supplied configuration.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Descriptor(_))
    }
}
