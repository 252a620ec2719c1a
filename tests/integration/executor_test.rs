//! Executor lifecycle, ordering and control operations.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use tokio::sync::Mutex;

use agenthub_core::events::TaskEventKind;
use agenthub_entity::task::{NewTask, TaskParameters, TaskStatus};

use crate::helpers::{self, WAIT};

#[tokio::test]
async fn test_task_runs_pending_running_completed() {
    let executor = helpers::executor(2).await;
    let mut events = executor.subscribe();
    executor.start().await;

    let id = executor.submit(NewTask::new("n", "noop")).await;
    let task = executor.wait_for(id, WAIT).await.unwrap();
    executor.stop().await;

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.result, Some(json!({"ok": true})));
    assert!(task.error.is_none());

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        if event.task_id == id {
            seen.push(event.event);
        }
    }
    assert_eq!(
        seen,
        vec![
            TaskEventKind::Submitted,
            TaskEventKind::Started,
            TaskEventKind::Completed
        ]
    );
}

#[tokio::test]
async fn test_unregistered_type_fails_with_message() {
    let executor = helpers::executor(1).await;
    executor.start().await;

    let id = executor
        .submit_simple("g", "ghost", TaskParameters::new())
        .await;
    let task = executor.wait_for(id, WAIT).await.unwrap();
    executor.stop().await;

    assert_eq!(task.status, TaskStatus::Failed);
    assert!(!task.error.unwrap_or_default().is_empty());
    assert!(task.result.is_none());
}

#[tokio::test]
async fn test_higher_priority_dispatched_first_with_one_worker() {
    let executor = helpers::executor(1).await;
    let order = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&order);
    executor
        .register_fn("record", move |params| {
            let recorder = Arc::clone(&recorder);
            async move {
                recorder.lock().await.push(params["label"].clone());
                Ok(serde_json::Value::Null)
            }
        })
        .await
        .unwrap();

    let mut ids = Vec::new();
    for (label, priority) in [("low", 1), ("high", 9), ("mid", 5), ("mid-later", 5)] {
        let mut params = TaskParameters::new();
        params.insert("label".into(), json!(label));
        let id = executor
            .submit(
                NewTask::new(label, "record")
                    .with_parameters(params)
                    .with_priority(priority),
            )
            .await;
        ids.push(id);
    }

    executor.start().await;
    for id in ids {
        executor.wait_for(id, WAIT).await.unwrap();
    }
    executor.stop().await;

    assert_eq!(
        *order.lock().await,
        vec![json!("high"), json!("mid"), json!("mid-later"), json!("low")]
    );
}

#[tokio::test]
async fn test_dependency_gates_dispatch() {
    let executor = helpers::executor(2).await;
    let gate = helpers::register_gate(&executor).await;
    executor.start().await;

    let upstream = executor.submit(NewTask::new("upstream", "gate")).await;
    let downstream = executor
        .submit(NewTask::new("downstream", "noop").with_dependencies([upstream]))
        .await;

    assert!(helpers::wait_for_status(&executor, upstream, TaskStatus::Running).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        executor.get_status(downstream).await.unwrap().status,
        TaskStatus::Pending
    );

    gate.notify_one();
    let downstream = executor.wait_for(downstream, WAIT).await.unwrap();
    let upstream = executor.get_status(upstream).await.unwrap();
    executor.stop().await;

    assert_eq!(upstream.status, TaskStatus::Completed);
    assert_eq!(downstream.status, TaskStatus::Completed);
    assert!(downstream.started_at >= upstream.completed_at);
}

#[tokio::test]
async fn test_dependency_on_failed_task_stays_pending() {
    let executor = helpers::executor(2).await;
    executor.start().await;

    let failed = executor.submit(NewTask::new("broken", "ghost")).await;
    let orphan = executor
        .submit(NewTask::new("orphan", "noop").with_dependencies([failed]))
        .await;

    executor.wait_for(failed, WAIT).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        executor.get_status(orphan).await.unwrap().status,
        TaskStatus::Pending
    );

    assert!(executor.cancel(orphan).await);
    executor.stop().await;
    assert_eq!(
        executor.get_status(orphan).await.unwrap().status,
        TaskStatus::Cancelled
    );
}

#[tokio::test]
async fn test_cancel_pending_never_runs_and_is_idempotent() {
    let executor = helpers::executor(1).await;
    let id = executor.submit(NewTask::new("doomed", "noop")).await;

    assert!(executor.cancel(id).await);
    let cancelled = executor.get_status(id).await.unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert!(cancelled.completed_at.is_some());

    executor.start().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!executor.cancel(id).await);
    let after = executor.get_status(id).await.unwrap();
    executor.stop().await;

    assert_eq!(after.status, TaskStatus::Cancelled);
    assert!(after.started_at.is_none());
    assert_eq!(after.completed_at, cancelled.completed_at);
}

#[tokio::test]
async fn test_cancel_running_discards_late_result() {
    let executor = helpers::executor(1).await;
    let gate = helpers::register_gate(&executor).await;
    executor.start().await;

    let id = executor.submit(NewTask::new("slow", "gate")).await;
    assert!(helpers::wait_for_status(&executor, id, TaskStatus::Running).await);

    assert!(executor.cancel(id).await);
    assert_eq!(
        executor.get_status(id).await.unwrap().status,
        TaskStatus::Cancelled
    );

    gate.notify_one();
    // A follow-up task proves the worker finished with the gated one
    let next = executor.submit(NewTask::new("after", "noop")).await;
    executor.wait_for(next, WAIT).await.unwrap();
    let task = executor.get_status(id).await.unwrap();
    executor.stop().await;

    assert_eq!(task.status, TaskStatus::Cancelled);
    assert!(task.result.is_none());
}

#[tokio::test]
async fn test_pause_and_resume() {
    let executor = helpers::executor(1).await;
    let id = executor.submit(NewTask::new("held", "noop")).await;

    assert!(executor.pause(id).await);
    assert!(!executor.pause(id).await);
    executor.start().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        executor.get_status(id).await.unwrap().status,
        TaskStatus::Paused
    );

    assert!(executor.resume(id).await);
    assert!(!executor.resume(id).await);
    let task = executor.wait_for(id, WAIT).await.unwrap();
    executor.stop().await;

    assert_eq!(task.status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_running_task_cannot_be_paused() {
    let executor = helpers::executor(1).await;
    let gate = helpers::register_gate(&executor).await;
    executor.start().await;

    let id = executor.submit(NewTask::new("busy", "gate")).await;
    assert!(helpers::wait_for_status(&executor, id, TaskStatus::Running).await);
    assert!(!executor.pause(id).await);

    gate.notify_one();
    let task = executor.wait_for(id, WAIT).await.unwrap();
    executor.stop().await;
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.result, Some(json!("opened")));
}

#[tokio::test]
async fn test_stats_and_listing() {
    let executor = helpers::executor(3).await;
    executor.start().await;

    let ok = executor.submit(NewTask::new("a", "echo")).await;
    let bad = executor.submit(NewTask::new("b", "ghost")).await;
    let cancelled = executor.submit(NewTask::new("c", "noop").with_dependencies([bad])).await;
    executor.wait_for(ok, WAIT).await.unwrap();
    executor.wait_for(bad, WAIT).await.unwrap();
    executor.cancel(cancelled).await;
    executor.stop().await;

    let stats = executor.get_stats().await;
    assert!(!stats.running);
    assert_eq!(stats.num_workers, 3);
    assert_eq!(stats.total_tasks, 3);
    assert_eq!(
        (stats.completed, stats.failed, stats.cancelled),
        (1, 1, 1)
    );
    assert_eq!(stats.registered_types, vec!["echo", "noop", "sleep"]);

    let listed: Vec<_> = executor.list_tasks(10).await.into_iter().map(|t| t.id).collect();
    assert_eq!(listed, vec![cancelled, bad, ok]);
    assert_eq!(executor.list_tasks(1).await.len(), 1);

    let failed = executor.list_tasks_by_status(TaskStatus::Failed, 10).await;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, bad);
}

#[tokio::test]
async fn test_each_task_claimed_exactly_once_across_workers() {
    const TASKS: usize = 200;

    let executor = helpers::executor(6).await;
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    executor
        .register_fn("count", move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok(json!(true))
            }
        })
        .await
        .unwrap();
    executor.start().await;

    let mut ids = Vec::with_capacity(TASKS);
    for i in 0..TASKS {
        ids.push(
            executor
                .submit(NewTask::new(format!("count-{i}"), "count"))
                .await,
        );
    }
    for id in &ids {
        let task = executor.wait_for(*id, WAIT).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }
    executor.stop().await;

    assert_eq!(runs.load(Ordering::SeqCst), TASKS);
    let stats = executor.get_stats().await;
    assert_eq!((stats.total_tasks, stats.completed), (TASKS, TASKS));
}
