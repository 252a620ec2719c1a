//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use agenthub_core::config::AppConfig;
use agenthub_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate configuration file
    Validate,
    /// Write the default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config/generated.toml")]
        output: String,
    },
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let config = super::load_config(config_path)?;
            match format {
                OutputFormat::Json => output::print_json(&config),
                OutputFormat::Table => print_summary(&config),
            }
        }
        ConfigCommand::Validate => match super::load_config(config_path) {
            Ok(config) => {
                output::print_success(&format!("Configuration '{config_path}' is valid"));
                print_summary(&config);
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {e}"));
                return Err(e);
            }
        },
        ConfigCommand::Generate { output: out_path } => {
            let default_config = include_str!("../../../../config/default.toml");

            if let Some(parent) = std::path::Path::new(out_path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(out_path, default_config).await?;

            output::print_success(&format!("Default config written to '{out_path}'"));
        }
    }

    Ok(())
}

fn print_summary(config: &AppConfig) {
    println!("Executor");
    output::print_kv("Enabled", &config.executor.enabled.to_string());
    output::print_kv("Workers", &config.executor.num_workers.to_string());
    output::print_kv(
        "Poll interval",
        &format!("{}ms", config.executor.poll_interval_ms),
    );
    output::print_kv(
        "Shutdown timeout",
        &format!("{}s", config.executor.shutdown_timeout_seconds),
    );

    println!("Scheduler");
    output::print_kv("Enabled", &config.scheduler.enabled.to_string());
    output::print_kv("Tick", &format!("{}ms", config.scheduler.tick_interval_ms));
    output::print_kv("Default timezone", &config.scheduler.default_timezone);
    output::print_kv("Schedules", &config.scheduler.schedules.len().to_string());

    println!("Notifications");
    output::print_kv("Enabled", &config.notifications.enabled.to_string());
    let events: Vec<&str> = config
        .notifications
        .events
        .iter()
        .map(|e| e.as_str())
        .collect();
    output::print_kv("Events", &events.join(", "));
    for channel in &config.notifications.channels {
        output::print_kv(channel.kind(), channel.target());
    }

    println!("Logging");
    output::print_kv("Level", &config.logging.level);
    output::print_kv("Format", &config.logging.format);
}
