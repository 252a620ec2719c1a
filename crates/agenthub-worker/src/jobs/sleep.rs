//! Handler that sleeps for a requested duration.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use agenthub_entity::task::TaskParameters;

use crate::executor::{TaskExecutionError, TaskHandler};

/// Task type served by [`SleepTaskHandler`]
pub const TASK_TYPE: &str = "sleep";

/// Sleeps for `duration_ms` milliseconds, capped at `max_duration`
#[derive(Debug, Clone)]
pub struct SleepTaskHandler {
    /// Longest sleep accepted
    max_duration: Duration,
}

impl SleepTaskHandler {
    /// Create a handler refusing sleeps longer than `max_duration`
    pub fn new(max_duration: Duration) -> Self {
        Self { max_duration }
    }
}

impl Default for SleepTaskHandler {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

#[async_trait]
impl TaskHandler for SleepTaskHandler {
    async fn execute(&self, parameters: &TaskParameters) -> Result<Value, TaskExecutionError> {
        let millis = match parameters.get("duration_ms") {
            None => 0,
            Some(value) => value.as_u64().ok_or_else(|| {
                TaskExecutionError::InvalidParameters(format!(
                    "duration_ms must be a non-negative integer, got {value}"
                ))
            })?,
        };

        let duration = Duration::from_millis(millis);
        if duration > self.max_duration {
            return Err(TaskExecutionError::InvalidParameters(format!(
                "duration_ms {millis} exceeds maximum of {}ms",
                self.max_duration.as_millis()
            )));
        }

        tracing::debug!("Sleeping for {}ms", millis);
        tokio::time::sleep(duration).await;
        Ok(serde_json::json!({ "slept_ms": millis }))
    }
}
