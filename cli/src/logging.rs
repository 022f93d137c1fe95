// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Phase log files
//!
//! Each invocation logs to `init.out` until the verb is known, then to the
//! verb's own file (`deployWorkload.out`, `startWorkload.out`, ...). The
//! subscriber is installed once; the file behind it is swapped in place.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use deployer_core::domain::deployer_config::DeployerConfig;

pub const INIT_LOG_FILE_NAME: &str = "init.out";

/// Shared handle to the current phase log file.
#[derive(Clone)]
pub struct PhaseLog {
    file: Arc<Mutex<File>>,
    path: Arc<Mutex<PathBuf>>,
}

impl PhaseLog {
    /// Create (truncating) `dir/name` and direct output to it.
    pub fn open(dir: &Path, name: &str) -> Result<Self> {
        let path = dir.join(name);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            path: Arc::new(Mutex::new(path)),
        })
    }

    /// Redirect subsequent output to a new file.
    pub fn switch_to(&self, dir: &Path, name: &str) -> Result<()> {
        let path = dir.join(name);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        let mut current = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("phase log lock poisoned"))?;
        current.flush().ok();
        *current = file;
        if let Ok(mut current_path) = self.path.lock() {
            *current_path = path;
        }
        Ok(())
    }

    pub fn current_path(&self) -> PathBuf {
        self.path
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl Write for PhaseLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file
            .lock()
            .map_err(|_| io::Error::other("phase log lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file
            .lock()
            .map_err(|_| io::Error::other("phase log lock poisoned"))?
            .flush()
    }
}

/// Open `init.out` in the configured log directory, or in the fallback
/// directory when the configuration failed to load.
pub fn open_init_log(config: Option<&DeployerConfig>) -> Result<PhaseLog> {
    let dir = config
        .map(|c| c.log_dir.clone())
        .unwrap_or_else(DeployerConfig::fallback_log_dir);
    PhaseLog::open(&dir, INIT_LOG_FILE_NAME)
}

/// Initialize tracing subscriber writing to the phase log
pub fn init_logging(level: &str, log: PhaseLog) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(move || log.clone())
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;

    Ok(())
}
