//! CLI command definitions and dispatch.

pub mod config;
pub mod run;
pub mod schedule;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use agenthub_core::config::AppConfig;
use agenthub_core::error::AppError;

/// AgentHub — background tasks, schedules and notifications
#[derive(Debug, Parser)]
#[command(name = "agenthub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Configuration management
    Config(config::ConfigArgs),
    /// Cron schedule inspection
    Schedule(schedule::ScheduleArgs),
    /// Run a single task in-process and print its outcome
    Run(run::RunArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Config(args) => config::execute(args, &self.config, self.format).await,
            Commands::Schedule(args) => schedule::execute(args, &self.config, self.format).await,
            Commands::Run(args) => run::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file, overlaid with `AGENTHUB_ENV` and
/// `AGENTHUB__*` variables
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    let env = std::env::var("AGENTHUB_ENV").ok();
    AppConfig::load(config_path, env.as_deref())
}
