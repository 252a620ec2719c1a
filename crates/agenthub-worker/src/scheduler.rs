//! Cron scheduler — named recurring schedules that fire a callback when due.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing;

use agenthub_core::config::SchedulerConfig;
use agenthub_core::error::AppError;
use agenthub_core::result::AppResult;
use agenthub_core::types::id::ScheduleId;
use agenthub_entity::schedule::{NewSchedule, Schedule};
use agenthub_entity::task::NewTask;

use crate::background::BackgroundExecutor;
use crate::crontab::CronExpression;

/// Invoked with a schedule's task definition when it is due
#[async_trait]
pub trait ScheduleCallback: Send + Sync {
    /// Handle one firing
    async fn fire(&self, task_definition: Value) -> AppResult<()>;
}

/// Adapter turning an async closure into a [`ScheduleCallback`]
struct FnCallback<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> ScheduleCallback for FnCallback<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    async fn fire(&self, task_definition: Value) -> AppResult<()> {
        (self.f)(task_definition).await
    }
}

/// Wrap an async closure as a callback
pub fn callback_fn<F, Fut>(f: F) -> Arc<dyn ScheduleCallback>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    Arc::new(FnCallback { f })
}

/// Callback that submits the task definition into a [`BackgroundExecutor`].
///
/// The definition must deserialize as a [`NewTask`]:
/// `{"name": ..., "task_type": ..., "parameters": {...}, "priority": 5}`.
#[derive(Debug, Clone)]
pub struct ExecutorForwarder {
    executor: Arc<BackgroundExecutor>,
}

impl ExecutorForwarder {
    /// Forward into `executor`
    pub fn new(executor: Arc<BackgroundExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ScheduleCallback for ExecutorForwarder {
    async fn fire(&self, task_definition: Value) -> AppResult<()> {
        let new: NewTask = serde_json::from_value(task_definition)
            .map_err(|e| AppError::validation(format!("Invalid task definition: {e}")))?;
        let task_id = self.executor.submit(new).await;
        tracing::debug!("Scheduled submission created task {}", task_id);
        Ok(())
    }
}

struct ScheduleEntry {
    schedule: Schedule,
    cron: CronExpression,
    callback: Option<Arc<dyn ScheduleCallback>>,
    order: u64,
}

#[derive(Default)]
struct ScheduleTable {
    entries: HashMap<ScheduleId, ScheduleEntry>,
    next_order: u64,
}

/// A due schedule collected during a tick
struct Firing {
    id: ScheduleId,
    name: String,
    task_definition: Value,
    callback: Option<Arc<dyn ScheduleCallback>>,
}

/// Handles of a started polling loop
struct PollingLoop {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Cron-driven schedule manager
pub struct TaskScheduler {
    table: Mutex<ScheduleTable>,
    default_callback: RwLock<Option<Arc<dyn ScheduleCallback>>>,
    tick_interval: Duration,
    polling: Mutex<Option<PollingLoop>>,
}

impl fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("tick_interval", &self.tick_interval)
            .finish_non_exhaustive()
    }
}

impl TaskScheduler {
    /// Create a stopped scheduler checking for due schedules every `tick_interval`
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            table: Mutex::new(ScheduleTable::default()),
            default_callback: RwLock::new(None),
            tick_interval,
            polling: Mutex::new(None),
        }
    }

    /// Create a stopped scheduler from configuration
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(Duration::from_millis(config.tick_interval_ms))
    }

    /// Create a schedule.
    ///
    /// The cron expression and timezone are validated here; a malformed
    /// expression is a validation error and nothing is stored.
    pub async fn schedule(&self, new: NewSchedule) -> AppResult<ScheduleId> {
        if new.name.trim().is_empty() {
            return Err(AppError::validation("Schedule name must not be empty"));
        }
        let cron = CronExpression::parse(&new.cron_expression, &new.timezone)?;

        let now = Utc::now();
        let schedule = Schedule {
            id: ScheduleId::new(),
            name: new.name,
            cron_expression: cron.expression().to_string(),
            timezone: cron.timezone().to_string(),
            task_definition: new.task_definition,
            enabled: new.enabled,
            next_run: if new.enabled {
                cron.next_after(now)
            } else {
                None
            },
            last_run: None,
            run_count: 0,
            created_at: now,
        };
        let id = schedule.id;

        tracing::info!(
            "Registered schedule: id={}, name='{}', cron='{}', tz={}, next_run={:?}",
            id,
            schedule.name,
            schedule.cron_expression,
            schedule.timezone,
            schedule.next_run
        );

        let mut table = self.table.lock().await;
        let order = table.next_order;
        table.next_order += 1;
        table.entries.insert(
            id,
            ScheduleEntry {
                schedule,
                cron,
                callback: None,
                order,
            },
        );
        Ok(id)
    }

    /// Snapshot of a schedule
    pub async fn get_schedule(&self, id: ScheduleId) -> Option<Schedule> {
        self.table
            .lock()
            .await
            .entries
            .get(&id)
            .map(|e| e.schedule.clone())
    }

    /// Schedules in creation order
    pub async fn list_schedules(&self, enabled_only: bool) -> Vec<Schedule> {
        let table = self.table.lock().await;
        let mut entries: Vec<&ScheduleEntry> = table
            .entries
            .values()
            .filter(|e| !enabled_only || e.schedule.enabled)
            .collect();
        entries.sort_by_key(|e| e.order);
        entries.into_iter().map(|e| e.schedule.clone()).collect()
    }

    /// Permanently remove a schedule and its callback
    pub async fn cancel(&self, id: ScheduleId) -> bool {
        let removed = self.table.lock().await.entries.remove(&id);
        match removed {
            Some(entry) => {
                tracing::info!("Schedule '{}' ({}) cancelled", entry.schedule.name, id);
                true
            }
            None => false,
        }
    }

    /// Disable a schedule. Returns `false` if unknown or already paused.
    pub async fn pause(&self, id: ScheduleId) -> bool {
        let mut table = self.table.lock().await;
        let Some(entry) = table.entries.get_mut(&id) else {
            return false;
        };
        if !entry.schedule.enabled {
            return false;
        }
        entry.schedule.enabled = false;
        entry.schedule.next_run = None;
        tracing::info!("Schedule '{}' ({}) paused", entry.schedule.name, id);
        true
    }

    /// Re-enable a schedule, computing `next_run` from now.
    /// Returns `false` if unknown or already enabled.
    pub async fn resume(&self, id: ScheduleId) -> bool {
        let mut table = self.table.lock().await;
        let Some(entry) = table.entries.get_mut(&id) else {
            return false;
        };
        if entry.schedule.enabled {
            return false;
        }
        entry.schedule.enabled = true;
        entry.schedule.next_run = entry.cron.next_after(Utc::now());
        tracing::info!(
            "Schedule '{}' ({}) resumed, next_run={:?}",
            entry.schedule.name,
            id,
            entry.schedule.next_run
        );
        true
    }

    /// Next firing time of an enabled schedule, always strictly in the future.
    ///
    /// A stored `next_run` that has already passed is still owed to the next
    /// tick, so it is left untouched and the following occurrence is reported.
    pub async fn get_next_run(&self, id: ScheduleId) -> Option<DateTime<Utc>> {
        let table = self.table.lock().await;
        let entry = table.entries.get(&id)?;
        if !entry.schedule.enabled {
            return None;
        }

        let now = Utc::now();
        match entry.schedule.next_run {
            Some(next) if next > now => Some(next),
            _ => entry.cron.next_after(now),
        }
    }

    /// Bind the callback invoked when schedule `id` fires
    pub async fn register_execution_callback(
        &self,
        id: ScheduleId,
        callback: Arc<dyn ScheduleCallback>,
    ) -> AppResult<()> {
        let mut table = self.table.lock().await;
        let entry = table
            .entries
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Schedule {id} not found")))?;
        entry.callback = Some(callback);
        Ok(())
    }

    /// Callback used by schedules without a dedicated one
    pub async fn set_default_callback(&self, callback: Arc<dyn ScheduleCallback>) {
        *self.default_callback.write().await = Some(callback);
    }

    /// Fire a schedule's callback now without touching `next_run`
    pub async fn trigger_now(&self, id: ScheduleId) -> AppResult<()> {
        let firing = {
            let table = self.table.lock().await;
            let entry = table
                .entries
                .get(&id)
                .ok_or_else(|| AppError::not_found(format!("Schedule {id} not found")))?;
            Firing {
                id,
                name: entry.schedule.name.clone(),
                task_definition: entry.schedule.task_definition.clone(),
                callback: entry.callback.clone(),
            }
        };

        let callback = self.resolve_callback(firing.callback).await.ok_or_else(|| {
            AppError::validation(format!(
                "Schedule '{}' has no execution callback",
                firing.name
            ))
        })?;

        tracing::info!("Manually triggering schedule '{}' ({})", firing.name, id);
        callback.fire(firing.task_definition).await
    }

    async fn resolve_callback(
        &self,
        own: Option<Arc<dyn ScheduleCallback>>,
    ) -> Option<Arc<dyn ScheduleCallback>> {
        match own {
            Some(callback) => Some(callback),
            None => self.default_callback.read().await.clone(),
        }
    }

    /// Fire every schedule due at `now` and advance its `next_run`.
    ///
    /// Callbacks run concurrently on their own tasks; failures and panics are
    /// logged and do not affect other schedules. Waits for every callback and
    /// returns the number of schedules that fired.
    pub async fn tick(&self, now: DateTime<Utc>) -> usize {
        let (fired, callbacks) = self.fire_due(now).await;
        join_all(callbacks).await;
        fired
    }

    /// Advance due schedules and spawn their callbacks without waiting on them
    async fn fire_due(&self, now: DateTime<Utc>) -> (usize, Vec<JoinHandle<()>>) {
        let due: Vec<Firing> = {
            let mut table = self.table.lock().await;
            let mut due: Vec<(&mut ScheduleEntry, u64)> = Vec::new();
            for entry in table.entries.values_mut() {
                if entry.schedule.is_due(now) {
                    let order = entry.order;
                    due.push((entry, order));
                }
            }
            due.sort_by_key(|(_, order)| *order);
            due.into_iter()
                .map(|(entry, _)| {
                    entry.schedule.last_run = Some(now);
                    entry.schedule.run_count += 1;
                    entry.schedule.next_run = entry.cron.next_after(now);
                    Firing {
                        id: entry.schedule.id,
                        name: entry.schedule.name.clone(),
                        task_definition: entry.schedule.task_definition.clone(),
                        callback: entry.callback.clone(),
                    }
                })
                .collect()
        };

        let fired = due.len();
        let mut callbacks = Vec::with_capacity(fired);
        for firing in due {
            let Some(callback) = self.resolve_callback(firing.callback.clone()).await else {
                tracing::warn!(
                    "Schedule '{}' ({}) is due but has no execution callback",
                    firing.name,
                    firing.id
                );
                continue;
            };

            tracing::debug!("Firing schedule '{}' ({})", firing.name, firing.id);
            callbacks.push(tokio::spawn(run_callback(firing, callback)));
        }
        (fired, callbacks)
    }

    /// Start the polling loop. Starting a running scheduler is a no-op.
    pub async fn start(self: &Arc<Self>) {
        let mut polling = self.polling.lock().await;
        if polling.is_some() {
            tracing::warn!("Task scheduler already running");
            return;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tracing::info!(
                "Task scheduler started, tick={}ms",
                scheduler.tick_interval.as_millis()
            );
            let mut ticker = time::interval(scheduler.tick_interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        // Callbacks are detached so a slow one never holds up the loop
                        let (fired, _callbacks) = scheduler.fire_due(Utc::now()).await;
                        if fired > 0 {
                            tracing::trace!("Scheduler tick fired {} schedule(s)", fired);
                        }
                    }
                }
            }
            tracing::info!("Task scheduler loop exited");
        });

        *polling = Some(PollingLoop { shutdown, handle });
    }

    /// Stop the polling loop and wait for it to exit
    pub async fn stop(&self) {
        let Some(polling) = self.polling.lock().await.take() else {
            return;
        };
        let _ = polling.shutdown.send(true);
        if let Err(e) = polling.handle.await {
            tracing::error!("Scheduler loop exited abnormally: {}", e);
        }
        tracing::info!("Task scheduler stopped");
    }

    /// Whether the polling loop is running
    pub async fn is_running(&self) -> bool {
        self.polling.lock().await.is_some()
    }
}

/// Run one callback, logging its error or panic
async fn run_callback(firing: Firing, callback: Arc<dyn ScheduleCallback>) {
    let definition = firing.task_definition;
    let result = tokio::spawn(async move { callback.fire(definition).await }).await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(
            "Schedule '{}' ({}) callback failed: {}",
            firing.name,
            firing.id,
            e
        ),
        Err(e) => tracing::error!(
            "Schedule '{}' ({}) callback panicked: {}",
            firing.name,
            firing.id,
            e
        ),
    }
}
