// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::path::Path;

use crate::domain::error::DeployError;
use crate::domain::instance::InstanceDescriptor;

/// Read and validate the instance descriptor written by the host agent.
pub fn load_descriptor(path: &Path) -> Result<InstanceDescriptor, DeployError> {
    let content = std::fs::read_to_string(path).map_err(|e| DeployError::io(path, e))?;
    let descriptor = InstanceDescriptor::from_json_str(&content)?;
    tracing::debug!(
        path = %path.display(),
        instance_id = %descriptor.workload.instance_id,
        "Loaded instance descriptor"
    );
    Ok(descriptor)
}
