//! Handler that returns its parameters.

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use agenthub_entity::task::TaskParameters;

use crate::executor::{TaskExecutionError, TaskHandler};

/// Task type served by [`EchoTaskHandler`]
pub const TASK_TYPE: &str = "echo";

/// Completes with the task parameters as its result
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoTaskHandler;

#[async_trait]
impl TaskHandler for EchoTaskHandler {
    async fn execute(&self, parameters: &TaskParameters) -> Result<Value, TaskExecutionError> {
        tracing::debug!("Echoing {} parameter(s)", parameters.len());
        Ok(Value::Object(parameters.clone()))
    }
}
