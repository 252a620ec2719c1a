//! Notification channel definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A destination for task lifecycle notifications.
///
/// Channels are declared in configuration as tagged tables, for example:
///
/// ```toml
/// [[notifications.channels]]
/// type = "webhook"
/// url = "https://hooks.example.com/agenthub"
/// secret = "s3cr3t"
/// timeout_seconds = 5
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationChannel {
    /// HTTP webhook receiving a JSON `POST` per event.
    Webhook {
        /// Target URL.
        url: String,
        /// Shared secret used to sign the request body.
        #[serde(default)]
        secret: Option<String>,
        /// Request timeout in seconds.
        #[serde(default = "default_timeout")]
        timeout_seconds: u64,
    },
}

impl NotificationChannel {
    /// Build a webhook channel with the default timeout and no secret.
    pub fn webhook(url: impl Into<String>) -> Self {
        Self::Webhook {
            url: url.into(),
            secret: None,
            timeout_seconds: default_timeout(),
        }
    }

    /// Short channel kind name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Webhook { .. } => "webhook",
        }
    }

    /// Human-readable target of the channel.
    pub fn target(&self) -> &str {
        match self {
            Self::Webhook { url, .. } => url,
        }
    }

    /// Delivery timeout for this channel.
    pub fn timeout(&self) -> Duration {
        match self {
            Self::Webhook {
                timeout_seconds, ..
            } => Duration::from_secs(*timeout_seconds),
        }
    }
}

fn default_timeout() -> u64 {
    10
}
