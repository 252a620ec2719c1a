//! Cron schedule inspection CLI commands.

use chrono::Utc;
use chrono_tz::Tz;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use agenthub_core::error::AppError;
use agenthub_worker::crontab::CronExpression;

/// Arguments for schedule commands
#[derive(Debug, Args)]
pub struct ScheduleArgs {
    /// Schedule subcommand
    #[command(subcommand)]
    pub command: ScheduleCommand,
}

/// Schedule subcommands
#[derive(Debug, Subcommand)]
pub enum ScheduleCommand {
    /// Validate a cron expression and print its next firing times
    Next {
        /// Cron expression, e.g. "0 0 * * *" or "@hourly"
        expression: String,
        /// IANA timezone the expression is evaluated in
        #[arg(short, long, default_value = "UTC")]
        timezone: String,
        /// Number of firing times to print
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },
    /// List schedules declared in the configuration file
    List,
}

/// Upcoming firing time row
#[derive(Debug, Serialize, Tabled)]
struct FiringRow {
    /// Position
    #[tabled(rename = "#")]
    index: usize,
    /// Firing time in UTC
    utc: String,
    /// Firing time in the schedule's timezone
    local: String,
}

/// Configured schedule row
#[derive(Debug, Serialize, Tabled)]
struct ScheduleRow {
    name: String,
    cron: String,
    timezone: String,
    task_type: String,
    priority: i32,
    enabled: bool,
    next_run: String,
}

/// Execute schedule commands
pub async fn execute(
    args: &ScheduleArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ScheduleCommand::Next {
            expression,
            timezone,
            count,
        } => {
            let cron = CronExpression::parse(expression, timezone)?;
            let tz: Tz = timezone
                .trim()
                .parse()
                .map_err(|_| AppError::validation(format!("Unknown timezone '{timezone}'")))?;

            let rows: Vec<FiringRow> = cron
                .upcoming(Utc::now(), *count)
                .into_iter()
                .enumerate()
                .map(|(i, at)| FiringRow {
                    index: i + 1,
                    utc: at.to_rfc3339(),
                    local: at.with_timezone(&tz).to_rfc3339(),
                })
                .collect();

            if rows.is_empty() {
                output::print_warning(&format!("'{expression}' never fires"));
            }
            output::print_list(&rows, format);
        }
        ScheduleCommand::List => {
            let config = super::load_config(config_path)?;
            let default_tz = &config.scheduler.default_timezone;
            let now = Utc::now();

            let rows: Vec<ScheduleRow> = config
                .scheduler
                .schedules
                .iter()
                .map(|def| {
                    let timezone = def.timezone.clone().unwrap_or_else(|| default_tz.clone());
                    let next_run = match CronExpression::parse(&def.cron, &timezone) {
                        Ok(_) if !def.enabled => "-".to_string(),
                        Ok(cron) => cron
                            .next_after(now)
                            .map(|t| t.to_rfc3339())
                            .unwrap_or_else(|| "never".to_string()),
                        Err(e) => format!("invalid: {}", e.message),
                    };
                    ScheduleRow {
                        name: def.name.clone(),
                        cron: def.cron.clone(),
                        timezone,
                        task_type: def.task_type.clone(),
                        priority: def.priority,
                        enabled: def.enabled,
                        next_run,
                    }
                })
                .collect();

            output::print_list(&rows, format);
        }
    }

    Ok(())
}
