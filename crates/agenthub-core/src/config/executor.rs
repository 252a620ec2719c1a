//! Background executor configuration.

use serde::{Deserialize, Serialize};

/// Worker pool configuration for the background executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Whether the executor is started by the server.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of concurrent workers pulling from the ready queue.
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    /// Upper bound in milliseconds an idle worker sleeps before re-polling.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Capacity of the lifecycle event broadcast channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Seconds the server waits for workers to drain on shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            num_workers: default_num_workers(),
            poll_interval_ms: default_poll_interval(),
            event_buffer: default_event_buffer(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_num_workers() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    500
}

fn default_event_buffer() -> usize {
    256
}

fn default_shutdown_timeout() -> u64 {
    30
}
