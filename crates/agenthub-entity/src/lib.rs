//! # agenthub-entity
//!
//! Entity models for AgentHub. Every struct in this crate is an in-memory
//! record owned by the executor or the scheduler; all entities derive
//! `Debug`, `Clone`, `Serialize` and `Deserialize` so snapshots can be
//! returned to callers and rendered as JSON.

pub mod schedule;
pub mod task;

pub use schedule::{NewSchedule, Schedule};
pub use task::{NewTask, Task, TaskParameters, TaskStatus};
