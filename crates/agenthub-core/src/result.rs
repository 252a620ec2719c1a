//! Convenience result type alias for AgentHub.

use crate::error::AppError;

/// A specialized `Result` type for AgentHub operations.
pub type AppResult<T> = Result<T, AppError>;
