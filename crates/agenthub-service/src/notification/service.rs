//! Best-effort delivery of task lifecycle events to notification channels.

use std::sync::Arc;

use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing;

use agenthub_core::config::NotificationsConfig;
use agenthub_core::error::AppError;
use agenthub_core::events::{TaskEvent, TaskEventKind};
use agenthub_core::result::AppResult;
use agenthub_core::types::NotificationChannel;

use super::webhook;

/// Outcome counts of one `notify` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    /// Channels that accepted the event.
    pub delivered: usize,
    /// Channels that could not be reached or rejected the event.
    pub failed: usize,
}

/// Delivers [`TaskEvent`]s to channels.
///
/// Delivery never fails from the caller's point of view: every channel error
/// is logged and counted in the returned [`DeliveryReport`].
#[derive(Debug, Clone)]
pub struct NotificationService {
    /// Shared HTTP client.
    client: Client,
    /// Channels used by [`notify_default`](Self::notify_default).
    channels: Vec<NotificationChannel>,
    /// Event kinds the forwarder passes on.
    events: Vec<TaskEventKind>,
}

impl NotificationService {
    /// Creates a service with no default channels.
    pub fn new(client: Client) -> Self {
        let defaults = NotificationsConfig::default();
        Self {
            client,
            channels: Vec::new(),
            events: defaults.events,
        }
    }

    /// Creates a service from the `notifications` configuration section.
    pub fn from_config(config: &NotificationsConfig) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("agenthub/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            channels: config.channels.clone(),
            events: config.events.clone(),
        })
    }

    /// Default channels.
    pub fn channels(&self) -> &[NotificationChannel] {
        &self.channels
    }

    /// Whether the forwarder passes on events of this kind.
    pub fn forwards(&self, kind: TaskEventKind) -> bool {
        self.events.contains(&kind)
    }

    /// Delivers `event` to every channel concurrently.
    pub async fn notify(
        &self,
        event: &TaskEvent,
        channels: &[NotificationChannel],
    ) -> DeliveryReport {
        let deliveries = channels.iter().map(|channel| async move {
            let result = self.deliver(event, channel).await;
            if let Err(e) = &result {
                tracing::warn!(
                    "Failed to deliver {} for task {} to {} {}: {}",
                    event.event,
                    event.task_id,
                    channel.kind(),
                    channel.target(),
                    e
                );
            }
            result.is_ok()
        });

        let outcomes = join_all(deliveries).await;
        let delivered = outcomes.iter().filter(|ok| **ok).count();
        let report = DeliveryReport {
            delivered,
            failed: outcomes.len() - delivered,
        };

        tracing::debug!(
            "Notification {} for task {}: delivered={}, failed={}",
            event.event,
            event.task_id,
            report.delivered,
            report.failed
        );
        report
    }

    /// Delivers `event` to the configured default channels.
    pub async fn notify_default(&self, event: &TaskEvent) -> DeliveryReport {
        self.notify(event, &self.channels).await
    }

    async fn deliver(&self, event: &TaskEvent, channel: &NotificationChannel) -> AppResult<()> {
        match channel {
            NotificationChannel::Webhook {
                url,
                secret,
                timeout_seconds: _,
            } => {
                webhook::deliver(
                    &self.client,
                    url,
                    secret.as_deref(),
                    channel.timeout(),
                    event,
                )
                .await
            }
        }
    }

    /// Forwards selected executor events to the default channels until the
    /// event stream closes.
    pub fn spawn_forwarder(
        self: Arc<Self>,
        mut events: broadcast::Receiver<TaskEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                "Notification forwarder started: {} channel(s), events={:?}",
                self.channels.len(),
                self.events
            );
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if self.forwards(event.event) {
                            self.notify_default(&event).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Notification forwarder lagged, {} event(s) dropped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::info!("Notification forwarder stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use agenthub_core::types::id::TaskId;
    use serde_json::json;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completed_event() -> TaskEvent {
        TaskEvent::new(
            TaskId::new(),
            "nightly-report",
            "report",
            TaskEventKind::Completed,
            "completed",
        )
        .with_result(Some(json!({"rows": 42})))
    }

    fn service() -> NotificationService {
        NotificationService::from_config(&NotificationsConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_webhook_receives_signed_event() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json"))
            .and(header("x-agenthub-event", "task.completed"))
            .and(header_exists("x-agenthub-signature"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let channel = NotificationChannel::Webhook {
            url: format!("{}/hook", server.uri()),
            secret: Some("s3cr3t".into()),
            timeout_seconds: 5,
        };
        let event = completed_event();
        let report = service().notify(&event, &[channel]).await;
        assert_eq!(report, DeliveryReport { delivered: 1, failed: 0 });

        let requests = server.received_requests().await.unwrap();
        let request = &requests[0];
        let signature = request
            .headers
            .get("x-agenthub-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert_eq!(signature, webhook::sign("s3cr3t", &request.body));

        let body: TaskEvent = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body, event);
    }

    #[tokio::test]
    async fn test_unsigned_without_secret() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let report = service()
            .notify(&completed_event(), &[NotificationChannel::webhook(server.uri())])
            .await;
        assert_eq!(report.delivered, 1);

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("x-agenthub-signature").is_none());
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_raised() {
        let ok = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&ok)
            .await;
        let broken = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&broken)
            .await;
        let slow = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&slow)
            .await;

        let channels = [
            NotificationChannel::webhook(ok.uri()),
            NotificationChannel::webhook(broken.uri()),
            NotificationChannel::Webhook {
                url: slow.uri(),
                secret: None,
                timeout_seconds: 1,
            },
            NotificationChannel::webhook("http://127.0.0.1:1/unreachable"),
        ];
        let report = service().notify(&completed_event(), &channels).await;
        assert_eq!(report, DeliveryReport { delivered: 1, failed: 3 });
    }

    #[tokio::test]
    async fn test_bare_service_delivers_to_explicit_channels() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let service = NotificationService::new(Client::new());
        assert!(service.channels().is_empty());
        assert!(service.forwards(TaskEventKind::Failed));
        assert!(!service.forwards(TaskEventKind::Started));

        let event = completed_event();
        assert_eq!(service.notify_default(&event).await, DeliveryReport::default());
        let report = service
            .notify(&event, &[NotificationChannel::webhook(server.uri())])
            .await;
        assert_eq!(report, DeliveryReport { delivered: 1, failed: 0 });
    }

    #[tokio::test]
    async fn test_no_channels_is_empty_report() {
        let report = service().notify_default(&completed_event()).await;
        assert_eq!(report, DeliveryReport::default());
    }

    #[tokio::test]
    async fn test_forwarder_filters_event_kinds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let config = NotificationsConfig {
            enabled: true,
            channels: vec![NotificationChannel::webhook(server.uri())],
            ..NotificationsConfig::default()
        };
        let service = Arc::new(NotificationService::from_config(&config).unwrap());

        let (tx, rx) = broadcast::channel(16);
        let forwarder = service.spawn_forwarder(rx);

        let started = TaskEvent::new(TaskId::new(), "t", "noop", TaskEventKind::Started, "running");
        tx.send(started).unwrap();
        tx.send(completed_event()).unwrap();
        drop(tx);
        forwarder.await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: TaskEvent = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body.event, TaskEventKind::Completed);
    }
}
