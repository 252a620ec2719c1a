//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section; every field carries a default so an empty file is valid.

pub mod executor;
pub mod logging;
pub mod notification;
pub mod scheduler;

use serde::{Deserialize, Serialize};

pub use self::executor::ExecutorConfig;
pub use self::logging::LoggingConfig;
pub use self::notification::NotificationsConfig;
pub use self::scheduler::{ScheduleDefinition, SchedulerConfig};

use crate::error::AppError;

/// Prefix of environment variables that override file settings.
const ENV_PREFIX: &str = "AGENTHUB";

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (base file + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Background executor settings.
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// Recurring schedule settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Lifecycle notification settings.
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the base file at `path` (extension optional) with an
    /// environment-specific overlay `config/<env>` and environment variables
    /// prefixed with `AGENTHUB__` (e.g. `AGENTHUB__EXECUTOR__NUM_WORKERS=8`).
    pub fn load(path: &str, env: Option<&str>) -> Result<Self, AppError> {
        let mut builder =
            config::Config::builder().add_source(config::File::with_name(path).required(false));

        if let Some(env) = env {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{env}")).required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let app: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        app.validate()?;
        Ok(app)
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml(source: &str) -> Result<Self, AppError> {
        let app: Self = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        app.validate()?;
        Ok(app)
    }

    /// Reject settings the runtime cannot operate with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.executor.num_workers == 0 {
            return Err(AppError::configuration(
                "executor.num_workers must be at least 1",
            ));
        }
        if self.executor.poll_interval_ms == 0 {
            return Err(AppError::configuration(
                "executor.poll_interval_ms must be greater than zero",
            ));
        }
        if self.scheduler.tick_interval_ms == 0 {
            return Err(AppError::configuration(
                "scheduler.tick_interval_ms must be greater than zero",
            ));
        }
        for def in &self.scheduler.schedules {
            if def.name.trim().is_empty() || def.task_type.trim().is_empty() {
                return Err(AppError::configuration(format!(
                    "schedule '{}' needs both a name and a task_type",
                    def.name
                )));
            }
        }
        Ok(())
    }
}
