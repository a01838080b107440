//! Crawl job definitions
//!
//! A job is one execution attempt of a crawler. It moves
//! pending -> running -> (completed | failed) and never leaves a terminal status.

use chrono::{DateTime, Utc};
use std::fmt;

/// Lifecycle status of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobStatus {
    /// Job row created, crawler not started yet
    Pending,

    /// Crawler body is executing
    Running,

    /// Crawler returned normally
    Completed,

    /// Crawler (or its resolution) failed
    Failed,
}

impl JobStatus {
    /// Returns true for `Completed` and `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if a job in this status may be moved to `next`
    ///
    /// Re-applying the current status is always allowed so updates stay
    /// idempotent. Terminal statuses admit nothing else.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            Self::Pending => true,
            Self::Running => next.is_terminal(),
            Self::Completed | Self::Failed => false,
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn all_statuses() -> [Self; 4] {
        [Self::Pending, Self::Running, Self::Completed, Self::Failed]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// A persisted crawl job
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlJob {
    pub id: i64,

    /// Label of the source (or crawler) this job ran for
    pub source_name: String,

    pub status: JobStatus,

    /// Raw records observed by the crawler
    pub items_found: u64,

    /// Records newly persisted or updated
    pub items_added: u64,

    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,

    /// Set exactly when `status` is terminal
    pub completed_at: Option<DateTime<Utc>>,
}

/// A set-based update applied to a job row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub items_found: u64,
    pub items_added: u64,
    pub error_message: Option<String>,
}

impl JobUpdate {
    pub fn running() -> Self {
        Self {
            status: JobStatus::Running,
            items_found: 0,
            items_added: 0,
            error_message: None,
        }
    }

    pub fn completed(items_found: u64, items_added: u64) -> Self {
        Self {
            status: JobStatus::Completed,
            items_found,
            items_added,
            error_message: None,
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            items_found: 0,
            items_added: 0,
            error_message: Some(error_message.into()),
        }
    }
}
