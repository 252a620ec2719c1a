//! Handler registry — maps task types to registered units of work.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing;

use agenthub_core::error::AppError;
use agenthub_entity::task::TaskParameters;

/// Trait for task handler implementations
#[async_trait]
pub trait TaskHandler: Send + Sync + fmt::Debug {
    /// Execute the unit of work with the task's parameters
    async fn execute(&self, parameters: &TaskParameters) -> Result<Value, TaskExecutionError>;
}

/// Error from task execution
#[derive(Debug, thiserror::Error)]
pub enum TaskExecutionError {
    /// The unit of work failed
    #[error("Task failed: {0}")]
    Failed(String),

    /// The parameters did not match what the handler expects
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// Adapter turning an async closure into a [`TaskHandler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(TaskParameters) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, TaskExecutionError>> + Send + 'static,
{
    /// Wrap a closure
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> TaskHandler for FnHandler<F>
where
    F: Fn(TaskParameters) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, TaskExecutionError>> + Send + 'static,
{
    async fn execute(&self, parameters: &TaskParameters) -> Result<Value, TaskExecutionError> {
        (self.f)(parameters.clone()).await
    }
}

/// Registered task handlers by type.
///
/// Owned by a single executor instance; nothing is process-global.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn TaskHandler>>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the same type.
    ///
    /// Blank task types are rejected here so malformed registrations fail
    /// before any task is dispatched.
    pub async fn register(
        &self,
        task_type: &str,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<(), AppError> {
        let task_type = task_type.trim();
        if task_type.is_empty() {
            return Err(AppError::validation("Task type must not be empty"));
        }

        let replaced = self
            .handlers
            .write()
            .await
            .insert(task_type.to_string(), handler)
            .is_some();

        if replaced {
            tracing::info!("Replaced task handler for type '{}'", task_type);
        } else {
            tracing::info!("Registered task handler for type '{}'", task_type);
        }
        Ok(())
    }

    /// Look up the handler for a task type
    pub async fn get(&self, task_type: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.read().await.get(task_type).cloned()
    }

    /// Check if a handler is registered for a task type
    pub async fn has_handler(&self, task_type: &str) -> bool {
        self.handlers.read().await.contains_key(task_type)
    }

    /// Get the sorted list of registered task types
    pub async fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.read().await.keys().cloned().collect();
        types.sort();
        types
    }
}
