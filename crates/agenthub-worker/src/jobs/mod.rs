//! Built-in task handler implementations.

pub mod echo;
pub mod noop;
pub mod sleep;

pub use echo::EchoTaskHandler;
pub use noop::NoopTaskHandler;
pub use sleep::SleepTaskHandler;

use std::sync::Arc;

use agenthub_core::result::AppResult;

use crate::background::BackgroundExecutor;

/// Register `noop`, `echo` and `sleep` on `executor`
pub async fn register_builtin(executor: &BackgroundExecutor) -> AppResult<()> {
    executor
        .register_executor(noop::TASK_TYPE, Arc::new(NoopTaskHandler))
        .await?;
    executor
        .register_executor(echo::TASK_TYPE, Arc::new(EchoTaskHandler))
        .await?;
    executor
        .register_executor(sleep::TASK_TYPE, Arc::new(SleepTaskHandler::default()))
        .await?;
    Ok(())
}
