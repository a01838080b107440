//! Storage traits and error types
//!
//! This module defines the three store capabilities the orchestration layer
//! depends on. One backend may implement all of them; callers only see the
//! trait they need.

use crate::model::{CrawlJob, DataSource, JobStatus, JobUpdate, NewSubmission, SubmissionRecord};
use crate::storage::{JobStatusCount, UpsertOutcome};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Job not found: {0}")]
    JobNotFound(i64),

    #[error("Data source not found: {0}")]
    SourceNotFound(String),

    #[error("Invalid job transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Store lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable record of crawl executions
pub trait JobStore {
    /// Inserts a `pending` job and returns its id
    fn create_job(&mut self, source_label: &str) -> StorageResult<i64>;

    /// Applies a status/count update
    ///
    /// Re-applying the same update is a no-op in effect. A terminal status
    /// stamps `completed_at`; leaving a terminal status is rejected.
    fn update_job(&mut self, job_id: i64, update: &JobUpdate) -> StorageResult<()>;

    /// Gets a job by ID
    fn get_job(&self, job_id: i64) -> StorageResult<CrawlJob>;

    /// Deletes jobs created strictly before `now - days`, returning how many were removed
    fn purge_older_than(&mut self, days: u32) -> StorageResult<usize>;

    /// Aggregates jobs created on the given UTC day, grouped by status
    fn job_stats_for_day(&self, day: NaiveDate) -> StorageResult<Vec<JobStatusCount>>;
}

/// Store of normalized open-call listings
pub trait SubmissionStore {
    /// Inserts a listing, or refreshes `description`, `deadline` and
    /// `updated_at` of the listing with the same `(title, organizer)`
    fn upsert_submission(
        &mut self,
        submission: &NewSubmission,
        now: DateTime<Utc>,
    ) -> StorageResult<UpsertOutcome>;

    /// Looks up a listing by its dedup key
    fn get_submission_by_key(
        &self,
        title: &str,
        organizer: &str,
    ) -> StorageResult<Option<SubmissionRecord>>;

    /// Total number of stored listings
    fn count_submissions(&self) -> StorageResult<u64>;
}

/// Catalog of configured data sources
pub trait SourceCatalog {
    /// Loads every source, active or not
    fn load_sources(&self) -> StorageResult<Vec<DataSource>>;

    /// Inserts or replaces a source definition, keeping its `last_crawled_at`
    fn upsert_source(&mut self, source: &DataSource) -> StorageResult<()>;

    /// Records a successful crawl of the source
    fn mark_source_crawled(&mut self, source_id: &str, at: DateTime<Utc>) -> StorageResult<()>;
}

/// Locks a shared store, turning poisoning into a storage error
pub fn lock_store<'a, T: ?Sized>(
    store: &'a Mutex<T>,
    what: &'static str,
) -> StorageResult<MutexGuard<'a, T>> {
    store.lock().map_err(|_| StorageError::LockPoisoned(what))
}
