//! Background task execution and recurring schedules for AgentHub.
//!
//! This crate provides:
//! - A handler registry mapping task types to units of work
//! - An in-memory, priority-ordered, dependency-gated task table
//! - A fixed-size worker pool draining that table ([`BackgroundExecutor`])
//! - A cron scheduler firing callbacks when schedules are due ([`TaskScheduler`])
//! - Built-in handlers (`noop`, `echo`, `sleep`)

pub mod background;
pub mod crontab;
pub mod executor;
pub mod jobs;
pub mod queue;
pub mod runner;
pub mod scheduler;

pub use background::{BackgroundExecutor, ExecutorStats};
pub use executor::{HandlerRegistry, TaskExecutionError, TaskHandler};
pub use scheduler::{ExecutorForwarder, ScheduleCallback, TaskScheduler, callback_fn};
