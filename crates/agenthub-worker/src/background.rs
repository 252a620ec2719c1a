//! Background executor — a fixed-size worker pool over the task table.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing;

use agenthub_core::config::ExecutorConfig;
use agenthub_core::error::AppError;
use agenthub_core::events::TaskEvent;
use agenthub_core::result::AppResult;
use agenthub_core::types::id::TaskId;
use agenthub_entity::task::{NewTask, Task, TaskParameters, TaskStatus};

use crate::executor::{FnHandler, HandlerRegistry, TaskExecutionError, TaskHandler};
use crate::queue::TaskQueue;
use crate::runner::WorkerRunner;

/// Handles of a started pool
#[derive(Debug)]
struct WorkerPool {
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

/// Accepts task submissions and runs them on `num_workers` concurrent workers.
///
/// Tasks can be submitted before [`start`](Self::start); they wait in the
/// table until workers come up.
#[derive(Debug)]
pub struct BackgroundExecutor {
    queue: Arc<TaskQueue>,
    registry: Arc<HandlerRegistry>,
    config: ExecutorConfig,
    pool: Mutex<Option<WorkerPool>>,
}

impl BackgroundExecutor {
    /// Create a stopped executor
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            queue: Arc::new(TaskQueue::new(config.event_buffer)),
            registry: Arc::new(HandlerRegistry::new()),
            config,
            pool: Mutex::new(None),
        }
    }

    /// Create a stopped executor with default settings and `num_workers` workers
    pub fn with_workers(num_workers: usize) -> Self {
        Self::new(ExecutorConfig {
            num_workers: num_workers.max(1),
            ..ExecutorConfig::default()
        })
    }

    /// Associate a task type with a handler, replacing any previous one
    pub async fn register_executor(
        &self,
        task_type: &str,
        handler: Arc<dyn TaskHandler>,
    ) -> AppResult<()> {
        self.registry.register(task_type, handler).await
    }

    /// Register an async closure as the handler for a task type
    pub async fn register_fn<F, Fut>(&self, task_type: &str, f: F) -> AppResult<()>
    where
        F: Fn(TaskParameters) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, TaskExecutionError>> + Send + 'static,
    {
        self.register_executor(task_type, Arc::new(FnHandler::new(f)))
            .await
    }

    /// Submit a task. Always succeeds; the task starts pending.
    pub async fn submit(&self, new: NewTask) -> TaskId {
        self.queue.submit(new).await
    }

    /// Submit a task with default priority and no dependencies
    pub async fn submit_simple(
        &self,
        name: &str,
        task_type: &str,
        parameters: TaskParameters,
    ) -> TaskId {
        self.submit(NewTask::new(name, task_type).with_parameters(parameters))
            .await
    }

    /// Spin up the worker pool. Starting a running executor is a no-op.
    pub async fn start(&self) {
        let mut pool = self.pool.lock().await;
        if pool.is_some() {
            tracing::warn!("Background executor already running");
            return;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let workers = (0..self.config.num_workers)
            .map(|i| {
                let runner = WorkerRunner::new(
                    Arc::clone(&self.queue),
                    Arc::clone(&self.registry),
                    poll_interval,
                    format!("worker-{i}"),
                );
                let rx = shutdown_rx.clone();
                tokio::spawn(async move { runner.run(rx).await })
            })
            .collect();

        *pool = Some(WorkerPool { shutdown, workers });
        tracing::info!(
            "Background executor started with {} workers",
            self.config.num_workers
        );
    }

    /// Signal workers to exit and wait for all of them.
    ///
    /// In-flight units of work finish first; when this returns no worker is
    /// inside its dispatch loop. Stopping a stopped executor is a no-op.
    pub async fn stop(&self) {
        let Some(pool) = self.pool.lock().await.take() else {
            return;
        };

        tracing::info!("Background executor stopping, waiting for in-flight tasks...");
        let _ = pool.shutdown.send(true);

        for worker in pool.workers {
            if let Err(e) = worker.await {
                tracing::error!("Worker exited abnormally: {}", e);
            }
        }
        tracing::info!("Background executor stopped");
    }

    /// Whether the worker pool is up
    pub async fn is_running(&self) -> bool {
        self.pool.lock().await.is_some()
    }

    /// Snapshot of a task
    pub async fn get_status(&self, id: TaskId) -> Option<Task> {
        self.queue.get(id).await
    }

    /// Most recent tasks first
    pub async fn list_tasks(&self, limit: usize) -> Vec<Task> {
        self.queue.list(None, limit).await
    }

    /// Most recent tasks with the given status first
    pub async fn list_tasks_by_status(&self, status: TaskStatus, limit: usize) -> Vec<Task> {
        self.queue.list(Some(status), limit).await
    }

    /// Cancel a pending, paused or running task.
    ///
    /// Running work is not interrupted; its eventual result is discarded.
    /// Returns `false` for unknown or already terminal tasks.
    pub async fn cancel(&self, id: TaskId) -> bool {
        self.queue.cancel(id).await
    }

    /// Hold a pending task back. Returns `false` unless the task was pending.
    pub async fn pause(&self, id: TaskId) -> bool {
        self.queue.pause(id).await
    }

    /// Make a paused task pending again. Returns `false` unless it was paused.
    pub async fn resume(&self, id: TaskId) -> bool {
        self.queue.resume(id).await
    }

    /// Subscribe to task lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.queue.subscribe()
    }

    /// Wait until a task reaches a terminal status
    pub async fn wait_for(&self, id: TaskId, timeout: Duration) -> AppResult<Task> {
        let events = self.subscribe();
        tokio::time::timeout(timeout, self.wait_terminal(id, events))
            .await
            .map_err(|_| {
                AppError::timeout(format!(
                    "Task {id} did not finish within {}ms",
                    timeout.as_millis()
                ))
            })?
    }

    async fn wait_terminal(
        &self,
        id: TaskId,
        mut events: broadcast::Receiver<TaskEvent>,
    ) -> AppResult<Task> {
        loop {
            let task = self
                .queue
                .get(id)
                .await
                .ok_or_else(|| AppError::not_found(format!("Task {id} not found")))?;
            if task.is_terminal() {
                return Ok(task);
            }

            match events.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(AppError::service_unavailable(
                        "Executor event channel closed",
                    ));
                }
            }
        }
    }

    /// Executor and table statistics
    pub async fn get_stats(&self) -> ExecutorStats {
        let queue = self.queue.stats().await;
        ExecutorStats {
            running: self.is_running().await,
            num_workers: self.config.num_workers,
            total_tasks: queue.total,
            pending: queue.pending,
            running_tasks: queue.running,
            paused: queue.paused,
            completed: queue.completed,
            failed: queue.failed,
            cancelled: queue.cancelled,
            registered_types: self.registry.registered_types().await,
        }
    }
}

/// Executor statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorStats {
    /// Whether the worker pool is up
    pub running: bool,
    /// Configured pool size
    pub num_workers: usize,
    /// All tasks ever submitted
    pub total_tasks: usize,
    /// Pending tasks
    pub pending: usize,
    /// Tasks currently executing
    pub running_tasks: usize,
    /// Paused tasks
    pub paused: usize,
    /// Completed tasks
    pub completed: usize,
    /// Failed tasks
    pub failed: usize,
    /// Cancelled tasks
    pub cancelled: usize,
    /// Task types with a registered handler
    pub registered_types: Vec<String>,
}
