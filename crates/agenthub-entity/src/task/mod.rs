//! Background task entities.

pub mod model;
pub mod status;

pub use model::{NewTask, Task, TaskParameters};
pub use status::TaskStatus;
