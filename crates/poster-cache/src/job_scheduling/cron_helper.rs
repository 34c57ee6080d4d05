//! Cron utility functions for calculating next scheduled times
//!
//! Expressions use the `cron` crate syntax, which includes a leading seconds
//! field: `0 0 3 * * *` is daily at 03:00.

use chrono::{DateTime, Local, TimeZone};
use cron::Schedule;
use std::str::FromStr;

/// Parse a cron expression.
///
/// # Returns
/// * `Ok(Schedule)` - The parsed schedule
/// * `Err(String)` - Invalid cron expression with error message
pub fn parse_schedule(cron_expression: &str) -> Result<Schedule, String> {
    Schedule::from_str(cron_expression)
        .map_err(|e| format!("Invalid cron expression '{cron_expression}': {e}"))
}

/// First occurrence of `schedule` strictly after `after`, in the same timezone.
pub fn next_run_after<Tz: TimeZone>(schedule: &Schedule, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    schedule.after(after).next()
}

/// Calculate the next scheduled time in the local timezone from a cron expression
///
/// # Returns
/// * `Some(DateTime<Local>)` - The next scheduled time if the expression is valid
/// * `None` - If the cron expression is invalid or has no future schedules
pub fn calculate_next_scheduled_time(cron_expression: &str) -> Option<DateTime<Local>> {
    parse_schedule(cron_expression)
        .ok()
        .and_then(|schedule| schedule.upcoming(Local).next())
}
