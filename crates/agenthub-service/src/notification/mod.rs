//! Task lifecycle notifications and their channel transports.

pub mod service;
pub mod webhook;

pub use service::{DeliveryReport, NotificationService};
