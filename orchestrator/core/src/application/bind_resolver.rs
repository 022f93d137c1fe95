// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Bind Resolver
//!
//! Turns the declared local, shared and host bind paths into the final
//! `hostPath:containerPath` list handed to the engine. Local and shared
//! directories are pre-created with the configured permission bits and seeded
//! from previously staged archive content when it exists.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements bind resolution and materialization
//! - **Integration:** DeployProperties → BindMount list → LaunchSpec

use std::path::Path;
use tracing::{debug, info, warn};

use crate::domain::binds::{BindClass, BindLayout, BindMount, DeclaredBindPath, HostBindPolicy};
use crate::domain::deployer_config::CopyPolicy;
use crate::domain::error::DeployError;
use crate::domain::instance::InstanceDescriptor;
use crate::domain::properties::DeployProperties;
use crate::infrastructure::filesystem::{self, CopyFailure};

/// Resolved binds in local, shared, host order, plus any seeding failures
/// collected under the best-effort copy policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindResolution {
    pub binds: Vec<BindMount>,
    pub copy_failures: Vec<CopyFailure>,
}

impl BindResolution {
    pub fn engine_specs(&self) -> Vec<String> {
        self.binds.iter().map(BindMount::to_engine_spec).collect()
    }
}

pub fn resolve_binds(
    descriptor: &InstanceDescriptor,
    props: &DeployProperties,
    copy_policy: CopyPolicy,
) -> Result<BindResolution, DeployError> {
    let settings = &props.binds;
    if settings.local.is_empty() && settings.shared.is_empty() && settings.host.is_empty() {
        return Ok(BindResolution::default());
    }

    let layout = BindLayout::for_instance(descriptor, &settings.shared_root)?;
    let mut resolution = BindResolution::default();

    for (class, declared, root) in [
        (BindClass::Local, &settings.local, &layout.local_root),
        (BindClass::Shared, &settings.shared, &layout.shared_root),
    ] {
        if declared.is_empty() {
            continue;
        }
        let (binds, failures) = materialize_class(
            class,
            declared,
            root,
            &layout.archive_source,
            settings.dir_mode,
            copy_policy,
        )?;
        resolution.binds.extend(binds);
        resolution.copy_failures.extend(failures);
    }

    let host_binds = HostBindPolicy::new(settings.host_allow_list.clone()).admit(&settings.host)?;
    resolution.binds.extend(host_binds);

    if !resolution.copy_failures.is_empty() {
        warn!(
            failures = resolution.copy_failures.len(),
            "Some archive entries could not be copied into bind directories"
        );
    }
    info!(count = resolution.binds.len(), "Resolved bind mounts");
    Ok(resolution)
}

/// Pre-create every directory of one class, then seed each from the archive.
fn materialize_class(
    class: BindClass,
    declared: &[String],
    root: &Path,
    archive_source: &Path,
    dir_mode: u32,
    copy_policy: CopyPolicy,
) -> Result<(Vec<BindMount>, Vec<CopyFailure>), DeployError> {
    let paths = declared
        .iter()
        .map(|path| DeclaredBindPath::parse(path))
        .collect::<Result<Vec<_>, _>>()?;

    for path in &paths {
        filesystem::create_dir_all_with_mode(&path.local_path(root), dir_mode)?;
    }

    let mut binds = Vec::with_capacity(paths.len());
    let mut failures = Vec::new();
    for path in &paths {
        let local = path.local_path(root);
        binds.push(path.to_mount(class, root));
        failures.extend(seed_from_archive(
            &archive_source.join(&path.relative),
            &local,
            copy_policy,
        )?);
    }

    debug!(class = %class, root = %root.display(), count = binds.len(), "Materialized bind directories");
    Ok((binds, failures))
}

fn seed_from_archive(
    source: &Path,
    dest: &Path,
    copy_policy: CopyPolicy,
) -> Result<Vec<CopyFailure>, DeployError> {
    let Ok(metadata) = std::fs::metadata(source) else {
        return Ok(Vec::new());
    };
    if !metadata.is_dir() {
        return Err(DeployError::config(format!(
            "archive source {} is not a directory",
            source.display()
        )));
    }
    info!(source = %source.display(), dest = %dest.display(), "Seeding bind directory from archive");
    let report = filesystem::copy_dir_contents(source, dest, copy_policy)?;
    Ok(report.failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_declared_binds_resolves_empty() {
        let mut descriptor = InstanceDescriptor::default();
        descriptor.workload.source = "/acme/shop/v1".to_string();
        let props = DeployProperties::from_descriptor(&descriptor);
        let resolution = resolve_binds(&descriptor, &props, CopyPolicy::BestEffort).unwrap();
        assert!(resolution.binds.is_empty());
        assert!(resolution.engine_specs().is_empty());
    }
}
