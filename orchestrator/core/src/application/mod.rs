// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod bind_resolver;
pub mod launch_builder;
pub mod lifecycle;
pub mod log_forwarder;
pub mod monitor;
pub mod network_resolver;
pub mod readiness;

// Re-export the driver for convenience
pub use lifecycle::{LifecycleDriver, StartHandoff};
