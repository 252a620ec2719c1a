//! Task entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use agenthub_core::error::AppError;
use agenthub_core::types::id::TaskId;

use super::status::TaskStatus;

/// Opaque key/value parameters handed to a task executor.
pub type TaskParameters = Map<String, Value>;

/// Priority assigned when a submission does not specify one.
pub const DEFAULT_PRIORITY: i32 = 5;

/// A background task tracked by the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Human label.
    pub name: String,
    /// Task type selecting the registered executor.
    pub task_type: String,
    /// Parameters passed to the executor.
    pub parameters: TaskParameters,
    /// Higher values are served first.
    pub priority: i32,
    /// Tasks that must complete before this one becomes eligible.
    pub dependencies: Vec<TaskId>,
    /// Current status.
    pub status: TaskStatus,
    /// When the task was submitted.
    pub created_at: DateTime<Utc>,
    /// When a worker picked the task up.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Value returned by the executor.
    pub result: Option<Value>,
    /// Error message on failure.
    pub error: Option<String>,
    /// Cancellation was requested while the task was running.
    pub cancel_requested: bool,
    /// Submission order, used to break `created_at` ties.
    pub sequence: u64,
}

impl Task {
    /// Materialize a submission into a pending task.
    pub fn from_new(new: NewTask, sequence: u64) -> Self {
        Self {
            id: TaskId::new(),
            name: new.name,
            task_type: new.task_type,
            parameters: new.parameters,
            priority: new.priority,
            dependencies: new.dependencies,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            cancel_requested: false,
            sequence,
        }
    }

    /// Check whether the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next`, stamping the matching timestamp.
    ///
    /// Every status change goes through here; illegal moves are rejected
    /// with a conflict error and leave the task untouched.
    pub fn transition(&mut self, next: TaskStatus) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::conflict(format!(
                "Task {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }

        let now = Utc::now();
        match next {
            TaskStatus::Running => self.started_at = Some(now),
            status if status.is_terminal() => self.completed_at = Some(now),
            _ => {}
        }
        self.status = next;
        Ok(())
    }

    /// Record a successful result.
    pub fn complete(&mut self, result: Value) -> Result<(), AppError> {
        self.transition(TaskStatus::Completed)?;
        self.result = Some(result);
        Ok(())
    }

    /// Record a failure.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), AppError> {
        self.transition(TaskStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Ordering key for dispatch: higher priority first, then oldest first.
    pub fn dispatch_key(&self) -> (std::cmp::Reverse<i32>, DateTime<Utc>, u64) {
        (std::cmp::Reverse(self.priority), self.created_at, self.sequence)
    }
}

/// Data required to submit a new task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    /// Human label.
    pub name: String,
    /// Task type selecting the registered executor.
    pub task_type: String,
    /// Parameters passed to the executor.
    #[serde(default)]
    pub parameters: TaskParameters,
    /// Priority; higher is served first.
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Tasks that must complete first.
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
}

impl NewTask {
    /// Create a submission with default priority, no parameters and no
    /// dependencies.
    pub fn new(name: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            task_type: task_type.into(),
            parameters: TaskParameters::new(),
            priority: DEFAULT_PRIORITY,
            dependencies: Vec::new(),
        }
    }

    /// Set the parameters.
    pub fn with_parameters(mut self, parameters: TaskParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the dependencies.
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies = dependencies.into_iter().collect();
        self
    }
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Task {
        Task::from_new(NewTask::new("t", "noop"), 0)
    }

    #[test]
    fn test_new_task_defaults() {
        let task = pending();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, DEFAULT_PRIORITY);
        assert!(task.parameters.is_empty());
        assert!(task.started_at.is_none());
    }

    #[test]
    fn test_run_then_complete_stamps_timestamps() {
        let mut task = pending();
        task.transition(TaskStatus::Running).unwrap();
        assert!(task.started_at.is_some());
        task.complete(serde_json::json!({"ok": true})).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed_at.is_some());
        assert_eq!(task.result, Some(serde_json::json!({"ok": true})));
    }

    #[test]
    fn test_illegal_transition_leaves_task_untouched() {
        let mut task = pending();
        task.transition(TaskStatus::Running).unwrap();
        task.fail("boom").unwrap();
        let completed_at = task.completed_at;

        let err = task.transition(TaskStatus::Running).unwrap_err();
        assert_eq!(err.kind, agenthub_core::error::ErrorKind::Conflict);
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.completed_at, completed_at);
    }

    #[test]
    fn test_dispatch_key_orders_priority_then_age() {
        let low = Task::from_new(NewTask::new("low", "noop").with_priority(1), 0);
        let high = Task::from_new(NewTask::new("high", "noop").with_priority(9), 1);
        let high_later = Task::from_new(NewTask::new("high2", "noop").with_priority(9), 2);

        let mut tasks = [&low, &high_later, &high];
        tasks.sort_by_key(|t| t.dispatch_key());
        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["high", "high2", "low"]);
    }
}
