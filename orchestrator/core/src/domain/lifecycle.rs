// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lifecycle State
//!
//! `absent → created → running → stopped → absent`. No state object
//! survives between invocations; the current state is reconstructed from the
//! engine's view of the container on every operation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::engine::{ContainerDetails, ContainerStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Absent,
    Created,
    Running,
    Stopped,
}

impl LifecycleState {
    pub fn from_details(details: Option<&ContainerDetails>) -> Self {
        match details.map(|d| d.status) {
            None => Self::Absent,
            Some(ContainerStatus::Created) => Self::Created,
            Some(ContainerStatus::Running | ContainerStatus::Paused | ContainerStatus::Restarting) => {
                Self::Running
            }
            Some(ContainerStatus::Exited | ContainerStatus::Dead | ContainerStatus::Removing) => {
                Self::Stopped
            }
        }
    }

    pub fn can_deploy(self) -> bool {
        self == Self::Absent
    }

    pub fn can_start(self) -> bool {
        matches!(self, Self::Created | Self::Stopped)
    }

    pub fn can_stop(self) -> bool {
        self == Self::Running
    }

    /// Remove is legal, and idempotent, from every state.
    pub fn can_remove(self) -> bool {
        true
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}
