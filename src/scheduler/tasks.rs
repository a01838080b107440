//! Recurring task table evaluated on every scheduler wake-up
//!
//! Each entry is a `(cadence, task, next due time)` triple. Due-time
//! arithmetic lives here so it can be tested without a running loop.

use crate::config::{parse_time_of_day, SchedulerConfig};
use crate::ConfigError;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use std::fmt;
use std::time::Duration;

/// How often a recurring task fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Fixed interval, first firing one interval after start
    Every(Duration),
    /// Once a day at a UTC time of day
    DailyAt(NaiveTime),
}

impl Cadence {
    /// First firing time strictly after `after`
    pub fn next_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Cadence::Every(interval) => ChronoDuration::from_std(interval)
                .ok()
                .and_then(|step| after.checked_add_signed(step))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            Cadence::DailyAt(time) => {
                let today = after.date_naive().and_time(time).and_utc();
                if today > after {
                    today
                } else {
                    today + ChronoDuration::days(1)
                }
            }
        }
    }
}

/// Work the scheduler knows how to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Crawl every active source whose interval has elapsed
    DispatchDue,
    /// Replace the in-memory source list from the catalog
    ReloadSources,
    /// Delete jobs past the retention window
    PurgeJobs,
}

impl TaskKind {
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::DispatchDue => "dispatch-due",
            TaskKind::ReloadSources => "reload-sources",
            TaskKind::PurgeJobs => "purge-jobs",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
struct RecurringTask {
    kind: TaskKind,
    cadence: Cadence,
    next_due: DateTime<Utc>,
}

/// The scheduler's recurring tasks and when each is next due
#[derive(Debug, Clone, Default)]
pub struct TaskTable {
    tasks: Vec<RecurringTask>,
}

impl TaskTable {
    /// Builds a table whose tasks first fire after `start`
    pub fn new(start: DateTime<Utc>, cadences: &[(TaskKind, Cadence)]) -> Self {
        let tasks = cadences
            .iter()
            .map(|&(kind, cadence)| RecurringTask {
                kind,
                cadence,
                next_due: cadence.next_after(start),
            })
            .collect();
        Self { tasks }
    }

    /// Takes the tasks due at `now`, in table order, and reschedules them
    ///
    /// Missed firings are not replayed: a task that overran several
    /// intervals runs once and is next due one cadence after `now`.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<TaskKind> {
        let mut due = Vec::new();
        for task in &mut self.tasks {
            if task.next_due <= now {
                due.push(task.kind);
                task.next_due = task.cadence.next_after(now);
            }
        }
        due
    }

    /// Next firing time of every task, in table order
    pub fn next_runs(&self) -> Vec<(TaskKind, DateTime<Utc>)> {
        self.tasks.iter().map(|t| (t.kind, t.next_due)).collect()
    }
}

/// The standard cadences: dispatch, reload, then the daily purge
pub fn default_cadences(
    config: &SchedulerConfig,
) -> Result<Vec<(TaskKind, Cadence)>, ConfigError> {
    let purge_at = parse_time_of_day(&config.purge_at)?;
    Ok(vec![
        (TaskKind::DispatchDue, Cadence::Every(config.dispatch_interval())),
        (TaskKind::ReloadSources, Cadence::Every(config.reload_interval())),
        (TaskKind::PurgeJobs, Cadence::DailyAt(purge_at)),
    ])
}
