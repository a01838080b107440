//! Storage module for persisting crawl data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Crawl job lifecycle rows and their purge
//! - Upserting normalized listings on their `(title, organizer)` key
//! - The data source catalog read by the scheduler

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{
    lock_store, JobStore, SourceCatalog, StorageError, StorageResult, SubmissionStore,
};

use crate::model::JobStatus;
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared handle to a job store
pub type SharedJobStore = Arc<Mutex<dyn JobStore + Send>>;

/// Shared handle to a submission store
pub type SharedSubmissionStore = Arc<Mutex<dyn SubmissionStore + Send>>;

/// Shared handle to a source catalog
pub type SharedSourceCatalog = Arc<Mutex<dyn SourceCatalog + Send>>;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// The store handles injected into the orchestration layer
#[derive(Clone)]
pub struct StoreHandles {
    pub jobs: SharedJobStore,
    pub submissions: SharedSubmissionStore,
    pub sources: SharedSourceCatalog,
}

impl StoreHandles {
    /// Wraps one SQLite backend so all three handles share a connection
    pub fn from_sqlite(storage: SqliteStorage) -> Self {
        Self::from_shared(Arc::new(Mutex::new(storage)))
    }

    /// Builds the handles from an already shared backend
    pub fn from_shared(shared: Arc<Mutex<SqliteStorage>>) -> Self {
        Self {
            jobs: shared.clone(),
            submissions: shared.clone(),
            sources: shared,
        }
    }
}

/// Outcome of upserting a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new row was inserted with this ID
    Created(i64),
    /// The existing row with this ID was refreshed
    Updated(i64),
}

impl UpsertOutcome {
    pub fn id(&self) -> i64 {
        match self {
            Self::Created(id) | Self::Updated(id) => *id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Per-status aggregate over one day's jobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatusCount {
    pub status: JobStatus,
    pub jobs: u64,
    pub items_found: u64,
    pub items_added: u64,
}

/// Formats a timestamp as fixed-width RFC 3339 so text order equals time order
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}
