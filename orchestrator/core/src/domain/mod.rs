// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Descriptor model, typed properties and the pure derivation rules for
//! binds, ports and networks, plus the container engine seam.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements the deployment model

pub mod artifacts;
pub mod binds;
pub mod deployer_config;
pub mod engine;
pub mod error;
pub mod instance;
pub mod lifecycle;
pub mod network;
pub mod ports;
pub mod properties;
