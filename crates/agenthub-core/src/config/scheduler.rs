//! Recurring schedule configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Cron scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the scheduler polling loop is started by the server.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval in milliseconds between due-schedule checks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Timezone applied to schedules that do not name one.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    /// Schedules registered at startup.
    #[serde(default)]
    pub schedules: Vec<ScheduleDefinition>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            tick_interval_ms: default_tick_interval(),
            default_timezone: default_timezone(),
            schedules: Vec::new(),
        }
    }
}

/// A statically configured schedule that submits a task when due.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDefinition {
    /// Schedule name.
    pub name: String,
    /// Five-field cron expression (or a six-field one with seconds).
    pub cron: String,
    /// IANA timezone name; falls back to `default_timezone`.
    #[serde(default)]
    pub timezone: Option<String>,
    /// Task type submitted to the executor.
    pub task_type: String,
    /// Priority of the submitted task.
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Parameters of the submitted task.
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Whether the schedule starts enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_tick_interval() -> u64 {
    1000
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_priority() -> i32 {
    5
}
