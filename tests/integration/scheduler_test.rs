//! Scheduler firing into the executor.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Timelike, Utc};
use serde_json::json;

use agenthub_core::config::AppConfig;
use agenthub_entity::schedule::NewSchedule;
use agenthub_entity::task::TaskStatus;
use agenthub_worker::{ExecutorForwarder, TaskScheduler};

use crate::helpers::{self, WAIT};

fn scheduler() -> Arc<TaskScheduler> {
    Arc::new(TaskScheduler::new(Duration::from_millis(20)))
}

#[tokio::test]
async fn test_invalid_cron_is_rejected() {
    let err = scheduler()
        .schedule(NewSchedule::new("X", "not a cron", json!({})))
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_midnight_schedule_next_run() {
    let scheduler = scheduler();
    let id = scheduler
        .schedule(NewSchedule::new("nightly", "0 0 * * *", json!({})))
        .await
        .unwrap();

    let next = scheduler.get_next_run(id).await.unwrap();
    assert_eq!((next.hour(), next.minute()), (0, 0));
    assert!(next > Utc::now());
}

#[tokio::test]
async fn test_due_schedule_submits_task() {
    let executor = helpers::executor(1).await;
    executor.start().await;

    let scheduler = scheduler();
    let id = scheduler
        .schedule(NewSchedule::new(
            "echo-hourly",
            "@hourly",
            json!({"name": "scheduled-echo", "task_type": "echo", "parameters": {"from": "cron"}}),
        ))
        .await
        .unwrap();
    scheduler
        .register_execution_callback(id, Arc::new(ExecutorForwarder::new(Arc::clone(&executor))))
        .await
        .unwrap();

    let due = scheduler.get_next_run(id).await.unwrap();
    assert_eq!(scheduler.tick(due).await, 1);

    let tasks = executor.list_tasks(10).await;
    assert_eq!(tasks.len(), 1);
    let task = executor.wait_for(tasks[0].id, WAIT).await.unwrap();
    executor.stop().await;

    assert_eq!(task.name, "scheduled-echo");
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.result, Some(json!({"from": "cron"})));

    let schedule = scheduler.get_schedule(id).await.unwrap();
    assert_eq!(schedule.run_count, 1);
    assert_eq!(schedule.last_run, Some(due));
    assert!(schedule.next_run > Some(due));
}

#[tokio::test]
async fn test_paused_schedule_does_not_fire() {
    let executor = helpers::executor(1).await;
    let scheduler = scheduler();
    scheduler
        .set_default_callback(Arc::new(ExecutorForwarder::new(Arc::clone(&executor))))
        .await;

    let id = scheduler
        .schedule(NewSchedule::new(
            "paused",
            "* * * * * *",
            json!({"name": "p", "task_type": "noop"}),
        ))
        .await
        .unwrap();
    assert!(scheduler.pause(id).await);

    assert_eq!(scheduler.tick(Utc::now() + chrono::Duration::hours(1)).await, 0);
    assert!(executor.list_tasks(10).await.is_empty());
}

#[tokio::test]
async fn test_configured_schedules_drive_executor() {
    let config = AppConfig::from_toml(
        r#"
        [scheduler]
        tick_interval_ms = 20

        [[scheduler.schedules]]
        name = "every-second"
        cron = "* * * * * *"
        task_type = "noop"
        priority = 8
        "#,
    )
    .unwrap();

    let executor = helpers::executor(1).await;
    executor.start().await;

    let scheduler = Arc::new(TaskScheduler::from_config(&config.scheduler));
    scheduler
        .set_default_callback(Arc::new(ExecutorForwarder::new(Arc::clone(&executor))))
        .await;
    for definition in &config.scheduler.schedules {
        scheduler
            .schedule(NewSchedule::from_definition(
                definition,
                &config.scheduler.default_timezone,
            ))
            .await
            .unwrap();
    }

    scheduler.start().await;
    tokio::time::sleep(Duration::from_millis(2500)).await;
    scheduler.stop().await;
    executor.stop().await;

    let tasks = executor.list_tasks(100).await;
    assert!(!tasks.is_empty(), "schedule never fired");
    assert!(tasks.iter().all(|t| t.name == "every-second" && t.priority == 8));
    assert!(tasks.iter().any(|t| t.status == TaskStatus::Completed));
}
