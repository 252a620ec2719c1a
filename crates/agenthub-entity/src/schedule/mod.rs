//! Recurring schedule entities.

pub mod model;

pub use model::{NewSchedule, Schedule};
