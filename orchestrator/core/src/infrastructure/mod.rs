// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod descriptor_loader;
pub mod filesystem;
pub mod runtime;

pub use runtime::DockerEngine;
