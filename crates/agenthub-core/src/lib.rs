//! # agenthub-core
//!
//! Core crate for AgentHub. Contains configuration schemas, typed
//! identifiers, task lifecycle events, notification channel definitions,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other AgentHub crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
