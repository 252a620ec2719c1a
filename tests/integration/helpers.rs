//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use agenthub_core::types::id::TaskId;
use agenthub_entity::task::TaskStatus;
use agenthub_worker::BackgroundExecutor;
use agenthub_worker::jobs;

/// Generous upper bound for anything a test waits on
pub const WAIT: Duration = Duration::from_secs(10);

/// Stopped executor with `noop`, `echo` and `sleep` registered
pub async fn executor(num_workers: usize) -> Arc<BackgroundExecutor> {
    let executor = Arc::new(BackgroundExecutor::with_workers(num_workers));
    jobs::register_builtin(&executor)
        .await
        .expect("built-in handlers register");
    executor
}

/// Register a `gate` task type that blocks until the returned notify fires
pub async fn register_gate(executor: &BackgroundExecutor) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    let release = Arc::clone(&gate);
    executor
        .register_fn("gate", move |_| {
            let release = Arc::clone(&release);
            async move {
                release.notified().await;
                Ok(serde_json::json!("opened"))
            }
        })
        .await
        .expect("gate handler registers");
    gate
}

/// Poll until the task reaches `status`, returning whether it did in time
pub async fn wait_for_status(
    executor: &BackgroundExecutor,
    id: TaskId,
    status: TaskStatus,
) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if executor.get_status(id).await.map(|t| t.status) == Some(status) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
