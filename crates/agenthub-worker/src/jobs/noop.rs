//! Handler that does nothing and reports success.

use async_trait::async_trait;
use serde_json::Value;

use agenthub_entity::task::TaskParameters;

use crate::executor::{TaskExecutionError, TaskHandler};

/// Task type served by [`NoopTaskHandler`]
pub const TASK_TYPE: &str = "noop";

/// Completes immediately with `{"ok": true}`
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTaskHandler;

#[async_trait]
impl TaskHandler for NoopTaskHandler {
    async fn execute(&self, _parameters: &TaskParameters) -> Result<Value, TaskExecutionError> {
        Ok(serde_json::json!({ "ok": true }))
    }
}
