//! Daily job statistics
//!
//! This module provides the read-only aggregate over crawl jobs: per status,
//! how many jobs ran on a UTC day and how many records they found and added.

use crate::model::JobStatus;
use crate::storage::{JobStatusCount, JobStore, StorageResult};
use chrono::NaiveDate;
use std::fmt::Write;

/// Job statistics for one day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatistics {
    /// The UTC day the jobs were created on
    pub day: NaiveDate,

    /// One entry per status that occurred, in lifecycle order
    pub by_status: Vec<JobStatusCount>,
}

impl JobStatistics {
    pub fn total_jobs(&self) -> u64 {
        self.by_status.iter().map(|c| c.jobs).sum()
    }

    pub fn items_found(&self) -> u64 {
        self.by_status.iter().map(|c| c.items_found).sum()
    }

    pub fn items_added(&self) -> u64 {
        self.by_status.iter().map(|c| c.items_added).sum()
    }

    /// Jobs with the given status
    pub fn jobs_with(&self, status: JobStatus) -> u64 {
        self.by_status
            .iter()
            .find(|c| c.status == status)
            .map(|c| c.jobs)
            .unwrap_or(0)
    }

    /// Completed jobs as a percentage of terminal jobs, `None` before any finished
    pub fn success_rate(&self) -> Option<f64> {
        let completed = self.jobs_with(JobStatus::Completed);
        let terminal = completed + self.jobs_with(JobStatus::Failed);
        (terminal > 0).then(|| completed as f64 / terminal as f64 * 100.0)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The job store to query
/// * `day` - UTC day whose jobs are aggregated
///
/// # Returns
///
/// * `Ok(JobStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_job_statistics(
    storage: &dyn JobStore,
    day: NaiveDate,
) -> StorageResult<JobStatistics> {
    Ok(JobStatistics {
        day,
        by_status: storage.job_stats_for_day(day)?,
    })
}

/// Formats statistics as the text printed by `print_statistics`
pub fn format_statistics(stats: &JobStatistics) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Crawl Jobs for {} ===\n", stats.day);

    if stats.by_status.is_empty() {
        let _ = writeln!(out, "No jobs recorded.");
        return out;
    }

    let _ = writeln!(out, "Jobs by Status:");
    for count in &stats.by_status {
        let _ = writeln!(
            out,
            "  {}: {} jobs, {} found, {} added",
            count.status, count.jobs, count.items_found, count.items_added
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Totals:");
    let _ = writeln!(out, "  Jobs: {}", stats.total_jobs());
    let _ = writeln!(out, "  Records found: {}", stats.items_found());
    let _ = writeln!(out, "  Records added: {}", stats.items_added());

    if let Some(rate) = stats.success_rate() {
        let _ = writeln!(out, "  Success rate: {:.1}%", rate);
    }

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &JobStatistics) {
    print!("{}", format_statistics(stats));
}
