// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Deployer Configuration
//
// Host-level settings for the deployer itself, independent of any single
// instance descriptor:
// - Where the instance descriptor and phase logs live
// - How to reach the container engine
// - Timeouts for stop and readiness probing
// - Bind seeding failure policy
// - Log forwarder endpoints

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "DEPLOYER_CONFIG_PATH";
pub const WORKLOAD_PID_FILE_ENV: &str = "APPRENDA_WORKLOAD_PIDFILE";

/// Top-level deployer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployerConfig {
    /// Instance descriptor location, relative to the working directory
    #[serde(default = "default_instance_path")]
    pub instance_path: PathBuf,

    /// Directory receiving the phase log files
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Container name prefix (`{prefix}-{app}-{version}-{instance}`)
    #[serde(default = "default_container_name_prefix")]
    pub container_name_prefix: String,

    /// Graceful stop timeout before the engine kills the container
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,

    /// File receiving the container PID on start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload_pid_file: Option<PathBuf>,

    #[serde(default)]
    pub docker: DockerConfig,

    #[serde(default)]
    pub readiness: ReadinessConfig,

    #[serde(default)]
    pub binds: BindsConfig,

    #[serde(default)]
    pub log_forwarder: LogForwarderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockerConfig {
    /// Custom socket path (None = auto-detect / DOCKER_HOST)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<String>,

    /// Engine API request timeout
    #[serde(default = "default_docker_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Delay between unsuccessful probe attempts
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-request timeout so a hung endpoint cannot stall the loop
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CopyPolicy {
    /// Log and collect per-entry failures, keep copying
    #[default]
    BestEffort,
    /// Abort on the first failed entry
    FailFast,
}

impl CopyPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "best-effort" | "besteffort" => Some(Self::BestEffort),
            "fail-fast" | "failfast" => Some(Self::FailFast),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindsConfig {
    #[serde(default)]
    pub copy_policy: CopyPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogForwarderConfig {
    #[serde(default = "default_forwarder_servers")]
    pub servers: Vec<String>,

    #[serde(default = "default_forwarder_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_instance_path() -> PathBuf {
    PathBuf::from("../instance.json")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_container_name_prefix() -> String {
    "apprenda".to_string()
}

fn default_stop_timeout_secs() -> u64 {
    30
}

fn default_docker_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_forwarder_servers() -> Vec<String> {
    vec!["localhost:6782".to_string()]
}

fn default_forwarder_timeout_secs() -> u64 {
    15
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            timeout_secs: default_docker_timeout_secs(),
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for LogForwarderConfig {
    fn default() -> Self {
        Self {
            servers: default_forwarder_servers(),
            timeout_secs: default_forwarder_timeout_secs(),
        }
    }
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            instance_path: default_instance_path(),
            log_dir: default_log_dir(),
            container_name_prefix: default_container_name_prefix(),
            stop_timeout_secs: default_stop_timeout_secs(),
            workload_pid_file: None,
            docker: DockerConfig::default(),
            readiness: ReadinessConfig::default(),
            binds: BindsConfig::default(),
            log_forwarder: LogForwarderConfig::default(),
        }
    }
}

impl DeployerConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. DEPLOYER_CONFIG_PATH environment variable
    /// 2. ./deployer-config.yaml (working directory)
    /// 3. ~/.deployer/config.yaml (user home)
    /// 4. /etc/deployer/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./deployer-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".deployer").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/deployer/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?
        } else if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    /// Log directory of a default configuration after environment overrides.
    /// Used when the configuration file itself could not be loaded.
    pub fn fallback_log_dir() -> PathBuf {
        Self::fallback_log_dir_with(|key| std::env::var(key).ok())
    }

    fn fallback_log_dir_with(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
        let mut config = Self::default();
        config.apply_overrides(lookup);
        config.log_dir
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("DEPLOYER_INSTANCE_PATH") {
            tracing::debug!("Environment override: DEPLOYER_INSTANCE_PATH={}", val);
            self.instance_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("DEPLOYER_LOG_DIR") {
            self.log_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("DEPLOYER_DOCKER_SOCKET") {
            self.docker.socket_path = Some(val);
        }
        if let Some(val) = lookup(WORKLOAD_PID_FILE_ENV).filter(|v| !v.is_empty()) {
            self.workload_pid_file = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup("DEPLOYER_COPY_POLICY") {
            match CopyPolicy::parse(&val) {
                Some(policy) => self.binds.copy_policy = policy,
                None => tracing::warn!(
                    "Invalid value for DEPLOYER_COPY_POLICY: '{}'. Expected best-effort/fail-fast. Ignoring.",
                    val
                ),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stop_timeout_secs == 0 {
            anyhow::bail!("stop_timeout_secs must be greater than zero");
        }
        if self.readiness.poll_interval_ms == 0 {
            anyhow::bail!("readiness.poll_interval_ms must be greater than zero");
        }
        if self.log_forwarder.servers.is_empty() {
            anyhow::bail!("log_forwarder.servers must list at least one server");
        }
        Ok(())
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.readiness.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = DeployerConfig::default();
        assert_eq!(config.instance_path, PathBuf::from("../instance.json"));
        assert_eq!(config.stop_timeout(), Duration::from_secs(30));
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.binds.copy_policy, CopyPolicy::BestEffort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
container_name_prefix: acp
binds:
  copy_policy: fail-fast
log_forwarder:
  servers: ["logs.internal:6782"]
"#;
        let config = DeployerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.container_name_prefix, "acp");
        assert_eq!(config.binds.copy_policy, CopyPolicy::FailFast);
        assert_eq!(config.log_forwarder.servers, vec!["logs.internal:6782"]);
        assert_eq!(config.log_forwarder.timeout_secs, 15);
        assert_eq!(config.docker.timeout_secs, 120);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DEPLOYER_INSTANCE_PATH", "/tmp/instance.json"),
            ("APPRENDA_WORKLOAD_PIDFILE", "/run/workload.pid"),
            ("DEPLOYER_COPY_POLICY", "fail-fast"),
        ]
        .into_iter()
        .collect();

        let mut config = DeployerConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.instance_path, PathBuf::from("/tmp/instance.json"));
        assert_eq!(config.workload_pid_file, Some(PathBuf::from("/run/workload.pid")));
        assert_eq!(config.binds.copy_policy, CopyPolicy::FailFast);
    }

    #[test]
    fn test_invalid_copy_policy_is_ignored() {
        let mut config = DeployerConfig::default();
        config.apply_overrides(|key| (key == "DEPLOYER_COPY_POLICY").then(|| "sometimes".to_string()));
        assert_eq!(config.binds.copy_policy, CopyPolicy::BestEffort);
    }

    #[test]
    fn test_validation() {
        let mut config = DeployerConfig::default();
        config.stop_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = DeployerConfig::default();
        config.log_forwarder.servers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fallback_log_dir_honours_env_override() {
        let dir = DeployerConfig::fallback_log_dir_with(|key| {
            (key == "DEPLOYER_LOG_DIR").then(|| "/var/log/deployer".to_string())
        });
        assert_eq!(dir, PathBuf::from("/var/log/deployer"));
        assert_eq!(
            DeployerConfig::fallback_log_dir_with(|_| None),
            DeployerConfig::default().log_dir
        );
    }
}
