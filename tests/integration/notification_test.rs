//! Executor lifecycle events delivered to webhooks.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use agenthub_core::config::NotificationsConfig;
use agenthub_core::events::{TaskEvent, TaskEventKind};
use agenthub_core::types::NotificationChannel;
use agenthub_entity::task::NewTask;
use agenthub_service::NotificationService;
use agenthub_service::notification::webhook;

use crate::helpers::{self, WAIT};

async fn wait_for_requests(server: &MockServer, count: usize) -> Vec<Request> {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let requests = server.received_requests().await.unwrap_or_default();
        if requests.len() >= count || tokio::time::Instant::now() >= deadline {
            return requests;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_completed_and_failed_tasks_are_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/events"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = NotificationsConfig {
        enabled: true,
        channels: vec![NotificationChannel::Webhook {
            url: format!("{}/events", server.uri()),
            secret: Some("hush".into()),
            timeout_seconds: 5,
        }],
        ..NotificationsConfig::default()
    };
    let notifier = Arc::new(NotificationService::from_config(&config).unwrap());

    let executor = helpers::executor(1).await;
    let forwarder = notifier.spawn_forwarder(executor.subscribe());
    executor.start().await;

    let ok = executor.submit(NewTask::new("fine", "noop")).await;
    executor.wait_for(ok, WAIT).await.unwrap();
    let bad = executor.submit(NewTask::new("broken", "ghost")).await;
    executor.wait_for(bad, WAIT).await.unwrap();
    executor.stop().await;

    let requests = wait_for_requests(&server, 2).await;
    forwarder.abort();
    assert_eq!(requests.len(), 2, "only terminal events are forwarded");

    for request in &requests {
        let signature = request
            .headers
            .get("x-agenthub-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert_eq!(signature, webhook::sign("hush", &request.body));
    }

    let events: Vec<TaskEvent> = requests
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();

    let completed = events.iter().find(|e| e.task_id == ok).unwrap();
    assert_eq!(completed.event, TaskEventKind::Completed);
    assert_eq!(completed.status, "completed");
    assert_eq!(completed.result, Some(json!({"ok": true})));

    let failed = events.iter().find(|e| e.task_id == bad).unwrap();
    assert_eq!(failed.event, TaskEventKind::Failed);
    assert!(failed.error.as_deref().unwrap_or_default().contains("ghost"));

    for (request, event) in requests.iter().zip(&events) {
        let event_header = request
            .headers
            .get("x-agenthub-event")
            .and_then(|v| v.to_str().ok());
        assert_eq!(event_header, Some(event.event.as_str()));
    }
}

#[tokio::test]
async fn test_broken_endpoint_does_not_affect_tasks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = NotificationsConfig {
        enabled: true,
        channels: vec![
            NotificationChannel::webhook(server.uri()),
            NotificationChannel::webhook("http://127.0.0.1:1/closed"),
        ],
        ..NotificationsConfig::default()
    };
    let notifier = Arc::new(NotificationService::from_config(&config).unwrap());

    let executor = helpers::executor(1).await;
    let forwarder = Arc::clone(&notifier).spawn_forwarder(executor.subscribe());
    executor.start().await;

    let id = executor.submit(NewTask::new("fine", "noop")).await;
    let task = executor.wait_for(id, WAIT).await.unwrap();
    executor.stop().await;

    let requests = wait_for_requests(&server, 1).await;
    forwarder.abort();
    assert_eq!(requests.len(), 1);
    assert!(task.error.is_none());

    let event = TaskEvent::new(id, "fine", "noop", TaskEventKind::Completed, "completed");
    let report = notifier.notify_default(&event).await;
    assert_eq!((report.delivered, report.failed), (0, 2));
}
