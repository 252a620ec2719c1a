//! In-memory task table: submission, dependency-gated priority selection,
//! and every status transition the executor performs.
//!
//! One mutex guards the whole table. It is held only while selecting or
//! mutating records, never while a unit of work runs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, Notify, broadcast};
use tracing;

use agenthub_core::events::{TaskEvent, TaskEventKind};
use agenthub_core::types::id::TaskId;
use agenthub_entity::task::{NewTask, Task, TaskStatus};

/// Outcome of a finished unit of work.
pub type TaskOutcome = Result<Value, String>;

#[derive(Debug, Default)]
struct TaskTable {
    tasks: HashMap<TaskId, Task>,
    next_sequence: u64,
}

impl TaskTable {
    fn dependencies_met(&self, task: &Task) -> bool {
        task.dependencies.iter().all(|dep| {
            self.tasks
                .get(dep)
                .is_some_and(|d| d.status == TaskStatus::Completed)
        })
    }

    fn next_ready(&self) -> Option<TaskId> {
        self.tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending && self.dependencies_met(t))
            .min_by_key(|t| t.dispatch_key())
            .map(|t| t.id)
    }
}

/// Shared task table for the executor and its workers
#[derive(Debug)]
pub struct TaskQueue {
    table: Mutex<TaskTable>,
    ready: Notify,
    events: broadcast::Sender<TaskEvent>,
}

impl TaskQueue {
    /// Create an empty table whose event channel buffers `event_buffer` events
    pub fn new(event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            table: Mutex::new(TaskTable::default()),
            ready: Notify::new(),
            events,
        }
    }

    /// Wakes idle workers whenever a task may have become ready
    pub fn ready(&self) -> &Notify {
        &self.ready
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    fn emit(&self, task: &Task, kind: TaskEventKind) {
        let event = TaskEvent::new(task.id, &task.name, &task.task_type, kind, task.status.as_str())
            .with_result(task.result.clone())
            .with_error(task.error.clone());
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Add a new pending task
    pub async fn submit(&self, new: NewTask) -> TaskId {
        let task = {
            let mut table = self.table.lock().await;
            let sequence = table.next_sequence;
            table.next_sequence += 1;
            let task = Task::from_new(new, sequence);
            table.tasks.insert(task.id, task.clone());
            task
        };

        tracing::debug!(
            "Submitted task: id={}, name='{}', type='{}', priority={}, dependencies={}",
            task.id,
            task.name,
            task.task_type,
            task.priority,
            task.dependencies.len()
        );

        self.emit(&task, TaskEventKind::Submitted);
        self.ready.notify_waiters();
        task.id
    }

    /// Atomically select the next ready task and mark it running.
    ///
    /// Ready means pending with every dependency completed; among ready
    /// tasks the highest priority wins, then the oldest submission.
    pub async fn claim_next(&self) -> Option<Task> {
        let mut table = self.table.lock().await;
        let id = table.next_ready()?;
        let task = table.tasks.get_mut(&id)?;

        if let Err(e) = task.transition(TaskStatus::Running) {
            tracing::error!("Failed to claim task {}: {}", id, e);
            return None;
        }

        let task = task.clone();
        drop(table);

        self.emit(&task, TaskEventKind::Started);
        Some(task)
    }

    /// Record the outcome of a unit of work.
    ///
    /// A task cancelled while running keeps its cancelled status and the
    /// outcome is discarded.
    pub async fn finish(&self, id: TaskId, outcome: TaskOutcome) -> Option<Task> {
        let mut table = self.table.lock().await;
        let task = table.tasks.get_mut(&id)?;

        if task.status == TaskStatus::Cancelled {
            tracing::debug!("Discarding outcome of cancelled task {}", id);
            return Some(task.clone());
        }

        let (applied, kind) = match outcome {
            Ok(value) => (task.complete(value), TaskEventKind::Completed),
            Err(message) => (task.fail(message), TaskEventKind::Failed),
        };
        if let Err(e) = applied {
            tracing::error!("Failed to record outcome of task {}: {}", id, e);
            return Some(task.clone());
        }

        let task = task.clone();
        drop(table);

        self.emit(&task, kind);
        // Completion may unblock dependents
        self.ready.notify_waiters();
        Some(task)
    }

    /// Cancel a non-terminal task. Returns `false` for unknown or terminal tasks.
    pub async fn cancel(&self, id: TaskId) -> bool {
        let mut table = self.table.lock().await;
        let Some(task) = table.tasks.get_mut(&id) else {
            return false;
        };
        if task.is_terminal() {
            return false;
        }

        if task.status == TaskStatus::Running {
            task.cancel_requested = true;
        }
        if let Err(e) = task.transition(TaskStatus::Cancelled) {
            tracing::error!("Failed to cancel task {}: {}", id, e);
            return false;
        }

        let task = task.clone();
        drop(table);

        tracing::info!(
            "Task cancelled: id={}, in_flight={}",
            task.id,
            task.cancel_requested
        );
        self.emit(&task, TaskEventKind::Cancelled);
        true
    }

    /// Hold a pending task back from dispatch
    pub async fn pause(&self, id: TaskId) -> bool {
        self.toggle(id, TaskStatus::Pending, TaskStatus::Paused, TaskEventKind::Paused)
            .await
    }

    /// Make a paused task eligible again
    pub async fn resume(&self, id: TaskId) -> bool {
        let resumed = self
            .toggle(id, TaskStatus::Paused, TaskStatus::Pending, TaskEventKind::Resumed)
            .await;
        if resumed {
            self.ready.notify_waiters();
        }
        resumed
    }

    async fn toggle(
        &self,
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
        kind: TaskEventKind,
    ) -> bool {
        let mut table = self.table.lock().await;
        let Some(task) = table.tasks.get_mut(&id) else {
            return false;
        };
        if task.status != from || task.transition(to).is_err() {
            return false;
        }

        let task = task.clone();
        drop(table);

        tracing::debug!("Task {}: {} -> {}", id, from, to);
        self.emit(&task, kind);
        true
    }

    /// Check whether a task has been cancelled
    pub async fn is_cancelled(&self, id: TaskId) -> bool {
        self.table
            .lock()
            .await
            .tasks
            .get(&id)
            .is_some_and(|t| t.status == TaskStatus::Cancelled)
    }

    /// Snapshot of a single task
    pub async fn get(&self, id: TaskId) -> Option<Task> {
        self.table.lock().await.tasks.get(&id).cloned()
    }

    /// Most recent tasks first, optionally filtered by status
    pub async fn list(&self, status: Option<TaskStatus>, limit: usize) -> Vec<Task> {
        let table = self.table.lock().await;
        let mut tasks: Vec<Task> = table
            .tasks
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        drop(table);

        tasks.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.sequence.cmp(&a.sequence))
        });
        tasks.truncate(limit);
        tasks
    }

    /// Count tasks per status
    pub async fn stats(&self) -> QueueStats {
        let table = self.table.lock().await;
        let mut stats = QueueStats {
            total: table.tasks.len(),
            ..QueueStats::default()
        };
        for task in table.tasks.values() {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Paused => stats.paused += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
                TaskStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}

/// Task counts per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// All tasks ever submitted
    pub total: usize,
    /// Pending tasks, ready or not
    pub pending: usize,
    /// Running tasks
    pub running: usize,
    /// Paused tasks
    pub paused: usize,
    /// Completed tasks
    pub completed: usize,
    /// Failed tasks
    pub failed: usize,
    /// Cancelled tasks
    pub cancelled: usize,
}
