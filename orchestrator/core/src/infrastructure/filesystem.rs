// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Bind Directory Filesystem Helpers
//!
//! Directory creation with explicit permission bits and recursive seeding of
//! bind directories from staged archive content.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Host filesystem effects behind the bind resolver
//!
//! Permission bits are applied with `set_permissions` after creation, so the
//! result never depends on the process umask. Directories that already exist
//! are left as they are.

use std::fs;
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::domain::deployer_config::CopyPolicy;
use crate::domain::error::DeployError;

/// One entry that could not be copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub copied: usize,
    pub failures: Vec<CopyFailure>,
}

/// Create `path` and any missing parents, then force `mode` on every
/// directory this call created.
///
/// An already existing directory is not an error and keeps its mode.
pub fn create_dir_all_with_mode(path: &Path, mode: u32) -> Result<(), DeployError> {
    let mut missing = Vec::new();
    let mut cursor = Some(path);
    while let Some(dir) = cursor {
        if dir.as_os_str().is_empty() || dir.is_dir() {
            break;
        }
        missing.push(dir.to_path_buf());
        cursor = dir.parent();
    }

    match fs::DirBuilder::new().recursive(true).mode(mode).create(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => {}
        Err(e) => return Err(DeployError::io(path, e)),
    }

    for dir in missing {
        fs::set_permissions(&dir, fs::Permissions::from_mode(mode))
            .map_err(|e| DeployError::io(&dir, e))?;
    }
    Ok(())
}

/// Recursively copy the contents of `source` into `dest`, merging with
/// whatever already exists there.
///
/// Subdirectories missing from `dest` are created with the mode of their
/// source directory. Under `BestEffort` every failed entry is logged and
/// collected; under `FailFast` the first failure aborts the copy.
pub fn copy_dir_contents(
    source: &Path,
    dest: &Path,
    policy: CopyPolicy,
) -> Result<CopyReport, DeployError> {
    let mut report = CopyReport::default();

    for entry in WalkDir::new(source).follow_links(false).min_depth(1) {
        let outcome = entry
            .map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| source.to_path_buf());
                (path, e.to_string())
            })
            .and_then(|entry| {
                let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
                let target = dest.join(relative);
                copy_entry(&entry, &target)
                    .map_err(|e| (entry.path().to_path_buf(), e.to_string()))
            });

        match outcome {
            Ok(()) => report.copied += 1,
            Err((path, error)) => {
                tracing::warn!(path = %path.display(), error = %error, "Failed to copy archive entry");
                if policy == CopyPolicy::FailFast {
                    return Err(DeployError::Copy {
                        source_dir: source.to_path_buf(),
                        failures: 1,
                        first: format!("{}: {}", path.display(), error),
                    });
                }
                report.failures.push(CopyFailure { path, error });
            }
        }
    }

    Ok(report)
}

fn copy_entry(entry: &walkdir::DirEntry, target: &Path) -> io::Result<()> {
    let file_type = entry.file_type();
    if file_type.is_dir() {
        match target.symlink_metadata() {
            Ok(existing) if existing.is_dir() => return Ok(()),
            Ok(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} exists and is not a directory", target.display()),
                ))
            }
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
            Err(_) => {}
        }
        let mode = entry.metadata().map_err(io::Error::other)?.permissions().mode() & 0o7777;
        fs::DirBuilder::new().mode(mode).create(target)?;
        fs::set_permissions(target, fs::Permissions::from_mode(mode))
    } else if file_type.is_symlink() {
        let link = fs::read_link(entry.path())?;
        if target.symlink_metadata().is_ok() {
            fs::remove_file(target)?;
        }
        std::os::unix::fs::symlink(link, target)
    } else {
        fs::copy(entry.path(), target).map(|_| ())
    }
}
