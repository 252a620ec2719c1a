//! Core type definitions used across the AgentHub workspace.

pub mod channel;
pub mod id;

pub use channel::NotificationChannel;
pub use id::*;
