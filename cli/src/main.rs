// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Instance Deployer CLI
//!
//! The `instance-deployer` binary is invoked by the host agent once per
//! lifecycle phase of a containerized workload instance.
//!
//! ## Commands
//!
//! - `instance-deployer deploy|start|stop|undeploy` - Lifecycle phases
//! - `instance-deployer config show|validate` - Configuration management
//!
//! Every phase logs to its own file in the configured log directory and
//! exits non-zero on failure.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::{error, info};

use deployer_core::domain::deployer_config::DeployerConfig;
use instance_deployer::commands::{self, ConfigCommand, Phase};
use instance_deployer::logging;

/// Container instance deployer - drive one workload through its lifecycle
#[derive(Parser)]
#[command(name = "instance-deployer")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "DEPLOYER_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "DEPLOYER_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the instance container
    Deploy,

    /// Start the container and hand it over to the host supervisor
    Start,

    /// Stop the running container
    Stop,

    /// Remove the container, its network and optionally its image
    Undeploy,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let phase = match cli.command {
        Commands::Config { command } => {
            return commands::config::handle_command(command, cli.config).await;
        }
        Commands::Deploy => Phase::Deploy,
        Commands::Start => Phase::Start,
        Commands::Stop => Phase::Stop,
        Commands::Undeploy => Phase::Undeploy,
    };

    let loaded = DeployerConfig::load_or_default(cli.config).context("Failed to load configuration");

    // A load failure is still recorded in init.out, under the fallback log dir
    let log = logging::open_init_log(loaded.as_ref().ok())?;
    logging::init_logging(&cli.log_level, log.clone())?;
    info!("Initializing deployer version {}", env!("CARGO_PKG_VERSION"));
    let config = loaded?;

    commands::lifecycle::handle_command(phase, config, &log).await
}
