// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Bind Mount Policy
//!
//! Pure rules for the three bind classes:
//!
//! - **local**: instance-private directories under `{host.root}/{instanceId}/docker-binds`
//! - **shared**: directories under `{sharedRoot}/{tenant}/{app}/{version}`
//! - **host**: operator-declared host paths admitted by a prefix allow-list
//!
//! Filesystem effects (directory creation, archive seeding) live in the
//! application-layer bind resolver; everything here is side-effect free.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements bind path parsing, scoping and the host allow-list

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::domain::error::DeployError;
use crate::domain::instance::InstanceDescriptor;

/// Platform versions whose staged content sits in the repository layout.
pub const LEGACY_ARCHIVE_PLATFORM_PREFIX: &str = "6.5";
pub const LOCAL_BINDS_DIR: &str = "docker-binds";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindClass {
    Local,
    Shared,
    Host,
}

impl fmt::Display for BindClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Shared => write!(f, "shared"),
            Self::Host => write!(f, "host"),
        }
    }
}

/// One `hostPath:containerPath` binding handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindMount {
    pub class: BindClass,
    pub host_path: String,
    /// Declared container path, including any `:options` suffix.
    pub container_path: String,
}

impl BindMount {
    /// Host binds are passed through as declared.
    pub fn host(declared: &str) -> Self {
        Self {
            class: BindClass::Host,
            host_path: declared.to_string(),
            container_path: String::new(),
        }
    }

    pub fn to_engine_spec(&self) -> String {
        if self.container_path.is_empty() {
            self.host_path.clone()
        } else {
            format!("{}:{}", self.host_path, self.container_path)
        }
    }
}

impl fmt::Display for BindMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_engine_spec())
    }
}

/// A declared local/shared bind path split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredBindPath {
    /// As declared, e.g. `/var/data:ro`.
    pub declared: String,
    /// Container path without the leading `/` and without options, e.g. `var/data`.
    pub relative: String,
}

impl DeclaredBindPath {
    pub fn parse(declared: &str) -> Result<Self, DeployError> {
        let Some(stripped) = declared.strip_prefix('/') else {
            return Err(DeployError::config(format!(
                "all bind mounts must be absolute paths, got '{}'",
                declared
            )));
        };
        let relative = match stripped.find(':') {
            Some(idx) => &stripped[..idx],
            None => stripped,
        };
        reject_traversal(relative, declared)?;
        Ok(Self {
            declared: declared.to_string(),
            relative: relative.to_string(),
        })
    }

    /// Host-side directory for this path under a class root.
    pub fn local_path(&self, root: &Path) -> PathBuf {
        root.join(&self.relative)
    }

    pub fn to_mount(&self, class: BindClass, root: &Path) -> BindMount {
        BindMount {
            class,
            host_path: self.local_path(root).to_string_lossy().into_owned(),
            container_path: self.declared.clone(),
        }
    }
}

fn reject_traversal(path: &str, declared: &str) -> Result<(), DeployError> {
    if Path::new(path)
        .components()
        .any(|component| component == Component::ParentDir)
    {
        tracing::warn!(path = %declared, "Bind path traversal attempt detected");
        return Err(DeployError::config(format!(
            "bind path '{}' must not contain '..' components",
            declared
        )));
    }
    Ok(())
}

/// Prefix allow-list for host binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostBindPolicy {
    approved: Vec<String>,
}

impl HostBindPolicy {
    pub fn new(approved: Vec<String>) -> Self {
        Self { approved }
    }

    pub fn is_approved(&self, path: &str) -> bool {
        self.approved.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// All-or-nothing: any rejected path fails the whole set.
    pub fn admit(&self, paths: &[String]) -> Result<Vec<BindMount>, DeployError> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        if self.approved.is_empty() {
            return Err(DeployError::config("host binding is not currently allowed"));
        }
        for path in paths {
            let host_side = path.split(':').next().unwrap_or(path);
            reject_traversal(host_side, path)?;
        }
        let rejected: Vec<&str> = paths
            .iter()
            .filter(|path| !self.is_approved(path))
            .map(String::as_str)
            .collect();
        if !rejected.is_empty() {
            return Err(DeployError::config(format!(
                "the following host binds are not allowed: {}",
                rejected.join(", ")
            )));
        }
        Ok(paths.iter().map(|path| BindMount::host(path)).collect())
    }
}

/// Directory layout the bind classes are rooted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindLayout {
    pub archive_source: PathBuf,
    pub local_root: PathBuf,
    pub shared_root: PathBuf,
}

impl BindLayout {
    pub fn for_instance(
        descriptor: &InstanceDescriptor,
        shared_root: &str,
    ) -> Result<Self, DeployError> {
        let tenant = descriptor.tenant_alias()?;
        let workload = &descriptor.workload;

        Ok(Self {
            archive_source: archive_source_dir(descriptor)?,
            local_root: Path::new(&descriptor.host.root)
                .join(&workload.instance_id)
                .join(LOCAL_BINDS_DIR),
            shared_root: Path::new(shared_root)
                .join(tenant)
                .join(&workload.application_alias)
                .join(&workload.version_alias),
        })
    }
}

/// Where previously staged workload content can be found.
///
/// 6.5 platforms keep it in the repository tree; later versions unpack it
/// under the instance temp directory.
pub fn archive_source_dir(descriptor: &InstanceDescriptor) -> Result<PathBuf, DeployError> {
    let workload = &descriptor.workload;
    if descriptor
        .platform
        .platform_version
        .starts_with(LEGACY_ARCHIVE_PLATFORM_PREFIX)
    {
        Ok(Path::new(&descriptor.host.repository_dir)
            .join(descriptor.tenant_alias()?)
            .join(&workload.application_alias)
            .join(&workload.version_alias)
            .join("base/linuxServices")
            .join(&workload.bundle_name))
    } else {
        Ok(Path::new(&descriptor.host.root)
            .join(&workload.instance_id)
            .join(format!("{}_temp", workload.instance_id))
            .join("workload"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(platform_version: &str) -> InstanceDescriptor {
        let mut d = InstanceDescriptor::default();
        d.platform.platform_version = platform_version.to_string();
        d.host.root = "/apprenda/instances".to_string();
        d.host.repository_dir = "/apprenda/repo".to_string();
        d.workload.source = "/acme/shop/v1".to_string();
        d.workload.application_alias = "shop".to_string();
        d.workload.version_alias = "v1".to_string();
        d.workload.bundle_name = "web".to_string();
        d.workload.instance_id = "i-42".to_string();
        d
    }

    #[test]
    fn test_parse_strips_options_suffix() {
        let path = DeclaredBindPath::parse("/var/data:ro").unwrap();
        assert_eq!(path.relative, "var/data");
        assert_eq!(path.declared, "/var/data:ro");

        let mount = path.to_mount(BindClass::Local, Path::new("/root/binds"));
        assert_eq!(mount.to_engine_spec(), "/root/binds/var/data:/var/data:ro");
    }

    #[test]
    fn test_parse_rejects_relative_paths() {
        let err = DeclaredBindPath::parse("var/data").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_parse_rejects_traversal() {
        assert!(DeclaredBindPath::parse("/data/../../etc").is_err());
        assert!(DeclaredBindPath::parse("/data/..hidden").is_ok());
    }

    #[test]
    fn test_host_policy_admits_prefixed_paths_unchanged() {
        let policy = HostBindPolicy::new(vec!["/data".to_string(), "/var/log".to_string()]);
        let paths = vec!["/data/app:/app".to_string(), "/var/log/shop".to_string()];
        let binds = policy.admit(&paths).unwrap();
        let specs: Vec<String> = binds.iter().map(BindMount::to_engine_spec).collect();
        assert_eq!(specs, paths);
    }

    #[test]
    fn test_host_policy_is_all_or_nothing() {
        let policy = HostBindPolicy::new(vec!["/data".to_string()]);
        let paths = vec!["/data/app".to_string(), "/etc/shadow".to_string()];
        let err = policy.admit(&paths).unwrap_err();
        assert!(err.to_string().contains("/etc/shadow"));
        assert!(!err.to_string().contains("/data/app,"));
    }

    #[test]
    fn test_empty_allow_list_rejects_all_host_binds() {
        let policy = HostBindPolicy::new(vec![]);
        let err = policy.admit(&["/data".to_string()]).unwrap_err();
        assert!(err.to_string().contains("host binding is not currently allowed"));
        assert!(policy.admit(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_archive_source_for_legacy_platform() {
        let dir = archive_source_dir(&descriptor("6.5.2")).unwrap();
        assert_eq!(
            dir,
            PathBuf::from("/apprenda/repo/acme/shop/v1/base/linuxServices/web")
        );
    }

    #[test]
    fn test_archive_source_for_current_platform() {
        let dir = archive_source_dir(&descriptor("8.2.0")).unwrap();
        assert_eq!(dir, PathBuf::from("/apprenda/instances/i-42/i-42_temp/workload"));
    }

    #[test]
    fn test_layout_roots() {
        let layout = BindLayout::for_instance(&descriptor("8.2.0"), "/srv/binds").unwrap();
        assert_eq!(layout.local_root, PathBuf::from("/apprenda/instances/i-42/docker-binds"));
        assert_eq!(layout.shared_root, PathBuf::from("/srv/binds/acme/shop/v1"));
    }
}
