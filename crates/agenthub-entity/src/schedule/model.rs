//! Schedule entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use agenthub_core::config::ScheduleDefinition;
use agenthub_core::types::id::ScheduleId;

/// A recurring cron-driven firing rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    /// Unique schedule identifier.
    pub id: ScheduleId,
    /// Schedule name.
    pub name: String,
    /// Cron expression as supplied by the caller.
    pub cron_expression: String,
    /// IANA timezone the expression is evaluated in.
    pub timezone: String,
    /// Payload forwarded to the execution callback.
    pub task_definition: Value,
    /// Disabled schedules never fire and keep no `next_run`.
    pub enabled: bool,
    /// Next firing time.
    pub next_run: Option<DateTime<Utc>>,
    /// Last firing time.
    pub last_run: Option<DateTime<Utc>>,
    /// Number of times the schedule has fired.
    pub run_count: u64,
    /// When the schedule was created.
    pub created_at: DateTime<Utc>,
}

impl Schedule {
    /// Check whether the schedule should fire at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_run.is_some_and(|next| next <= now)
    }
}

/// Data required to create a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSchedule {
    /// Schedule name.
    pub name: String,
    /// Cron expression.
    pub cron_expression: String,
    /// Payload forwarded to the execution callback.
    #[serde(default)]
    pub task_definition: Value,
    /// IANA timezone name.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Whether the schedule starts enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl NewSchedule {
    /// Create an enabled UTC schedule.
    pub fn new(
        name: impl Into<String>,
        cron_expression: impl Into<String>,
        task_definition: Value,
    ) -> Self {
        Self {
            name: name.into(),
            cron_expression: cron_expression.into(),
            task_definition,
            timezone: default_timezone(),
            enabled: true,
        }
    }

    /// Set the timezone.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Set whether the schedule starts enabled.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Build from a configured definition.
    ///
    /// The task definition is shaped like a `NewTask` so an executor-bound
    /// callback can deserialize it directly.
    pub fn from_definition(definition: &ScheduleDefinition, default_timezone: &str) -> Self {
        let task_definition = json!({
            "name": definition.name,
            "task_type": definition.task_type,
            "priority": definition.priority,
            "parameters": definition.parameters,
        });

        Self::new(&definition.name, &definition.cron, task_definition)
            .with_timezone(
                definition
                    .timezone
                    .as_deref()
                    .unwrap_or(default_timezone),
            )
            .enabled(definition.enabled)
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_true() -> bool {
    true
}
