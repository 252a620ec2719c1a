//! Domain events emitted by AgentHub components.
//!
//! Events are broadcast by the background executor and consumed by the
//! notification forwarder and any other subscriber.

pub mod task;

pub use task::{TaskEvent, TaskEventKind};
