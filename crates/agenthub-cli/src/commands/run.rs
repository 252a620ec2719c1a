//! One-shot task execution CLI command.

use std::time::Duration;

use clap::Args;
use serde_json::Value;

use crate::output::{self, OutputFormat};
use agenthub_core::error::AppError;
use agenthub_entity::task::{NewTask, Task, TaskParameters, TaskStatus};
use agenthub_worker::BackgroundExecutor;
use agenthub_worker::jobs;

/// Arguments for the run command
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Task type, e.g. "noop", "echo" or "sleep"
    pub task_type: String,

    /// Task parameters as a JSON object
    #[arg(short, long, default_value = "{}")]
    pub params: String,

    /// Task priority
    #[arg(long, default_value_t = 5)]
    pub priority: i32,

    /// Seconds to wait for the task to finish
    #[arg(short, long, default_value_t = 60)]
    pub timeout: u64,
}

/// Execute the run command
pub async fn execute(
    args: &RunArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let parameters = parse_params(&args.params)?;

    let executor = BackgroundExecutor::new(config.executor);
    jobs::register_builtin(&executor).await?;
    executor.start().await;

    let id = executor
        .submit(
            NewTask::new(&args.task_type, &args.task_type)
                .with_parameters(parameters)
                .with_priority(args.priority),
        )
        .await;

    let outcome = executor
        .wait_for(id, Duration::from_secs(args.timeout))
        .await;
    executor.stop().await;
    let task = outcome?;

    match format {
        OutputFormat::Json => output::print_json(&task),
        OutputFormat::Table => print_task(&task),
    }

    if task.status == TaskStatus::Failed {
        return Err(AppError::internal(format!(
            "Task {} failed: {}",
            task.id,
            task.error.unwrap_or_default()
        )));
    }
    Ok(())
}

fn parse_params(raw: &str) -> Result<TaskParameters, AppError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AppError::validation(format!(
            "--params must be a JSON object, got {other}"
        ))),
        Err(e) => Err(AppError::validation(format!("--params is not valid JSON: {e}"))),
    }
}

fn print_task(task: &Task) {
    output::print_kv("ID", &task.id.to_string());
    output::print_kv("Name", &task.name);
    output::print_kv("Type", &task.task_type);
    output::print_kv("Status", task.status.as_str());
    output::print_kv("Priority", &task.priority.to_string());
    if let (Some(started), Some(completed)) = (task.started_at, task.completed_at) {
        let elapsed = completed - started;
        output::print_kv("Duration", &format!("{}ms", elapsed.num_milliseconds()));
    }
    if let Some(result) = &task.result {
        output::print_kv("Result", &result.to_string());
    }
    if let Some(error) = &task.error {
        output::print_kv("Error", error);
    }
}
