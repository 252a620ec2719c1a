//! End-to-end tests wiring the executor, scheduler and notification service
//! together the way the server binary does.

mod executor_test;
mod helpers;
mod notification_test;
mod scheduler_test;
