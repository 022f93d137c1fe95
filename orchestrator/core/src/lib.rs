// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Deployer Core
//!
//! Drives a single containerized workload instance through deploy, start,
//! stop and remove on behalf of the platform host agent.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Descriptor model, resolvers and lifecycle driver

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
