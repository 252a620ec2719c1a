//! AgentHub Server — background task execution, cron scheduling and
//! lifecycle notifications.
//!
//! Main entry point that wires all crates together and runs until signalled.

use std::sync::Arc;
use std::time::Duration;

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use agenthub_core::config::AppConfig;
use agenthub_core::error::AppError;
use agenthub_entity::schedule::NewSchedule;
use agenthub_service::NotificationService;
use agenthub_worker::jobs;
use agenthub_worker::{BackgroundExecutor, ExecutorForwarder, TaskScheduler};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file, environment overlay and `AGENTHUB__*` variables
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("AGENTHUB_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    let env = std::env::var("AGENTHUB_ENV").ok();

    AppConfig::load(&config_path, env.as_deref())
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting AgentHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Executor with built-in handlers ──────────────────
    let executor = Arc::new(BackgroundExecutor::new(config.executor.clone()));
    jobs::register_builtin(&executor).await?;

    // ── Step 2: Notification forwarder ───────────────────────────
    // Subscribed before the pool starts so no lifecycle event is missed
    let forwarder_handle = if config.notifications.enabled {
        let notifier = Arc::new(NotificationService::from_config(&config.notifications)?);
        tracing::info!(
            "Forwarding task events to {} channel(s)",
            notifier.channels().len()
        );
        Some(notifier.spawn_forwarder(executor.subscribe()))
    } else {
        tracing::info!("Notifications disabled");
        None
    };

    // ── Step 3: Start worker pool ────────────────────────────────
    if config.executor.enabled {
        executor.start().await;
    } else {
        tracing::info!("Background executor disabled");
    }

    // ── Step 4: Scheduler and configured schedules ───────────────
    let scheduler = Arc::new(TaskScheduler::from_config(&config.scheduler));
    scheduler
        .set_default_callback(Arc::new(ExecutorForwarder::new(Arc::clone(&executor))))
        .await;

    for definition in &config.scheduler.schedules {
        let new = NewSchedule::from_definition(definition, &config.scheduler.default_timezone);
        let id = scheduler.schedule(new).await.map_err(|e| {
            AppError::configuration(format!("Schedule '{}': {}", definition.name, e.message))
        })?;
        tracing::info!(
            "Schedule '{}' ({}) next run: {:?}",
            definition.name,
            id,
            scheduler.get_next_run(id).await
        );
    }

    if config.scheduler.enabled {
        scheduler.start().await;
    } else {
        tracing::info!("Task scheduler disabled");
    }

    // ── Step 5: Wait for shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    // ── Step 6: Stop scheduler, then drain executor ──────────────
    let timeout = Duration::from_secs(config.executor.shutdown_timeout_seconds);
    let drained = tokio::time::timeout(timeout, async {
        scheduler.stop().await;
        executor.stop().await;
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            "Shutdown did not complete within {}s, abandoning in-flight tasks",
            timeout.as_secs()
        );
    }

    if let Some(handle) = forwarder_handle {
        handle.abort();
    }

    let stats = executor.get_stats().await;
    tracing::info!(
        "AgentHub server shut down: completed={}, failed={}, cancelled={}, pending={}",
        stats.completed,
        stats.failed,
        stats.cancelled,
        stats.pending
    );
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
