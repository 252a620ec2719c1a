//! Notification delivery configuration.

use serde::{Deserialize, Serialize};

use crate::events::TaskEventKind;
use crate::types::NotificationChannel;

/// Settings for forwarding task lifecycle events to external channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Whether lifecycle events are forwarded at all.
    #[serde(default)]
    pub enabled: bool,
    /// Which event kinds are forwarded.
    #[serde(default = "default_events")]
    pub events: Vec<TaskEventKind>,
    /// Destinations receiving every forwarded event.
    #[serde(default)]
    pub channels: Vec<NotificationChannel>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            events: default_events(),
            channels: Vec::new(),
        }
    }
}

fn default_events() -> Vec<TaskEventKind> {
    vec![
        TaskEventKind::Completed,
        TaskEventKind::Failed,
        TaskEventKind::Cancelled,
    ]
}
