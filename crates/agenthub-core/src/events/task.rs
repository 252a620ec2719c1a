//! Task lifecycle events.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::id::{EventId, TaskId};

/// The lifecycle transition an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventKind {
    /// The task was accepted by the executor.
    Submitted,
    /// A worker picked the task up.
    Started,
    /// The task finished successfully.
    Completed,
    /// The task failed.
    Failed,
    /// The task was cancelled.
    Cancelled,
    /// The task was paused while pending.
    Paused,
    /// A paused task was made eligible again.
    Resumed,
}

impl TaskEventKind {
    /// Dotted event name, e.g. `task.completed`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "task.submitted",
            Self::Started => "task.started",
            Self::Completed => "task.completed",
            Self::Failed => "task.failed",
            Self::Cancelled => "task.cancelled",
            Self::Paused => "task.paused",
            Self::Resumed => "task.resumed",
        }
    }
}

impl fmt::Display for TaskEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task lifecycle event, serialized verbatim as the webhook body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    /// Unique event ID.
    pub event_id: EventId,
    /// The task the event is about.
    pub task_id: TaskId,
    /// Task name.
    pub task_name: String,
    /// Task type.
    pub task_type: String,
    /// What happened.
    pub event: TaskEventKind,
    /// Task status after the transition (lowercase).
    pub status: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Result payload for completed tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error message for failed tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskEvent {
    /// Create a new event stamped with the current time.
    pub fn new(
        task_id: TaskId,
        task_name: impl Into<String>,
        task_type: impl Into<String>,
        event: TaskEventKind,
        status: impl Into<String>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            task_id,
            task_name: task_name.into(),
            task_type: task_type.into(),
            event,
            status: status.into(),
            timestamp: Utc::now(),
            result: None,
            error: None,
        }
    }

    /// Attach a result payload.
    pub fn with_result(mut self, result: Option<Value>) -> Self {
        self.result = result;
        self
    }

    /// Attach an error message.
    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }
}
