//! # agenthub-service
//!
//! Service layer for AgentHub. Currently hosts the outbound
//! [`NotificationService`], which delivers task lifecycle events to
//! configured channels on a best-effort basis.

pub mod notification;

pub use notification::{DeliveryReport, NotificationService};
