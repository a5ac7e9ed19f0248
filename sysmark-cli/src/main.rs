// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! sysmark CLI
//!
//! Command-line interface for the sysmark hardware benchmark harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sysmark_core::{Category, ConfigLoader, ConfigOverrides, SessionConfig};

mod commands;
mod display;

/// sysmark - CPU, RAM, disk and network throughput and latency benchmarks
#[derive(Parser)]
#[command(name = "sysmark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Save each category report as JSON into this directory
    #[arg(long, value_name = "DIR", global = true)]
    pub json: Option<PathBuf>,

    /// Trials per workload and unit count
    #[arg(long, global = true)]
    pub repeat: Option<u32>,

    /// Per-trial timeout in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub trial_timeout: Option<f64>,

    /// Per-category timeout in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub category_timeout: Option<f64>,

    /// Concurrency levels for IO-bound workloads, e.g. 1,4,8
    #[arg(long, value_delimiter = ',', global = true)]
    pub io_levels: Option<Vec<usize>>,

    /// Directory for temporary benchmark files
    #[arg(long, value_name = "DIR", global = true)]
    pub scratch_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the CPU benchmarks
    Cpu,

    /// Run the memory benchmarks
    Ram,

    /// Run the storage benchmarks
    Disk,

    /// Run the network benchmarks
    Network,

    /// Run every category in order
    All,

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: PathBuf,
    },

    /// Process-unit entry point used by process-scaled workloads
    #[command(hide = true)]
    Worker {
        #[arg(long)]
        workload: String,

        #[arg(long)]
        size: u64,
    },
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            repeat_count: self.repeat,
            per_trial_timeout_seconds: self.trial_timeout,
            category_timeout_seconds: self.category_timeout,
            io_concurrency_levels: self.io_levels.clone(),
            scratch_dir: self.scratch_dir.clone(),
        }
    }

    /// Defaults, then the config file, then command-line flags.
    fn session_config(&self) -> anyhow::Result<SessionConfig> {
        let overrides = self.overrides();
        let config = match &self.config {
            Some(path) => ConfigLoader::load_file_with(path, &overrides)?,
            None => ConfigLoader::from_overrides(&overrides)?,
        };
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; a worker's stdout carries the unit protocol.
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Dispatch to command handlers
    match &cli.command {
        Some(Commands::Worker { workload, size }) => commands::worker::execute(workload, *size),
        Some(Commands::Validate { file }) => commands::validate::execute(file),
        Some(Commands::Cpu) => commands::run::category(Category::Cpu, &cli),
        Some(Commands::Ram) => commands::run::category(Category::Ram, &cli),
        Some(Commands::Disk) => commands::run::category(Category::Disk, &cli),
        Some(Commands::Network) => commands::run::category(Category::Network, &cli),
        Some(Commands::All) => commands::run::all(&cli),
        None => commands::menu::execute(&cli),
    }
}
