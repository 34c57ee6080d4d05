//! Scheduling for recurring reconciliation sweeps
//!
//! - `cron_helper`: cron parsing and next-occurrence helpers
//! - `ReconcileScheduler`: long-running task that fires a sweep at each
//!   occurrence of the configured schedule in the local timezone

pub mod cron_helper;
pub mod reconcile_scheduler;

pub use cron_helper::{calculate_next_scheduled_time, next_run_after, parse_schedule};
pub use reconcile_scheduler::ReconcileScheduler;
