//! Worker runner — the loop each pool slot runs: claim a ready task,
//! dispatch it to its handler, record the outcome.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing;

use agenthub_entity::task::Task;

use crate::executor::HandlerRegistry;
use crate::queue::{TaskOutcome, TaskQueue};

/// A single worker slot of the executor pool
#[derive(Debug)]
pub struct WorkerRunner {
    /// Shared task table
    queue: Arc<TaskQueue>,
    /// Registered handlers
    registry: Arc<HandlerRegistry>,
    /// Upper bound on idle sleeps between polls
    poll_interval: Duration,
    /// Worker identifier used in logs
    worker_id: String,
}

impl WorkerRunner {
    /// Create a new worker runner
    pub fn new(
        queue: Arc<TaskQueue>,
        registry: Arc<HandlerRegistry>,
        poll_interval: Duration,
        worker_id: String,
    ) -> Self {
        Self {
            queue,
            registry,
            poll_interval,
            worker_id,
        }
    }

    /// Run until the shutdown signal flips to `true` (or its sender is dropped).
    ///
    /// The signal is only observed between tasks, so a unit of work already
    /// dispatched always runs to completion and has its outcome recorded.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "Worker '{}' started with poll_interval={}ms",
            self.worker_id,
            self.poll_interval.as_millis()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            // Register interest before claiming so a submit racing with an
            // empty claim still wakes us.
            let mut notified = pin!(self.queue.ready().notified());
            notified.as_mut().enable();

            if let Some(task) = self.queue.claim_next().await {
                self.dispatch(task).await;
                continue;
            }

            tracing::trace!("Worker '{}' idle", self.worker_id);
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = &mut notified => {}
                _ = time::sleep(self.poll_interval) => {}
            }
        }

        tracing::info!("Worker '{}' shut down", self.worker_id);
    }

    /// Execute one claimed task and record its outcome
    async fn dispatch(&self, task: Task) {
        let task_id = task.id;

        // `cancel` already broadcast `Cancelled`, pairing the `Started`
        // emitted by the claim, so nothing more is sent here.
        if self.queue.is_cancelled(task_id).await {
            tracing::debug!("Task {} cancelled before dispatch", task_id);
            return;
        }

        tracing::info!(
            "Worker '{}' processing task: id={}, name='{}', type='{}'",
            self.worker_id,
            task_id,
            task.name,
            task.task_type
        );

        let outcome = self.execute(&task).await;
        match &outcome {
            Ok(_) => tracing::info!("Task {} completed successfully", task_id),
            Err(msg) => tracing::warn!("Task {} failed: {}", task_id, msg),
        }

        self.queue.finish(task_id, outcome).await;
    }

    async fn execute(&self, task: &Task) -> TaskOutcome {
        let Some(handler) = self.registry.get(&task.task_type).await else {
            return Err(format!(
                "No executor registered for task type '{}'",
                task.task_type
            ));
        };

        // Run on its own tokio task so a panicking handler only fails this task
        let parameters = task.parameters.clone();
        let handle = tokio::spawn(async move { handler.execute(&parameters).await });

        match handle.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.to_string()),
            Err(join_err) if join_err.is_panic() => {
                Err(format!("Task handler panicked: {join_err}"))
            }
            Err(join_err) => Err(format!("Task handler aborted: {join_err}")),
        }
    }
}
