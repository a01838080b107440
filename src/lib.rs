//! Callboard: an open-call ingestion service
//!
//! This crate polls configured data sources on a recurring schedule, runs the
//! crawler bound to each due source, and pushes every discovered listing
//! (exhibitions, residencies, competitions, grants, conferences) through a
//! normalize, classify and deduplicate pipeline into SQLite. Every crawl
//! attempt is tracked as a job with a guaranteed terminal status.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod scheduler;
pub mod storage;

use thiserror::Error;

/// Main error type for Callboard operations
#[derive(Debug, Error)]
pub enum CallboardError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("{0}")]
    UnknownCrawler(#[from] crawler::UnknownCrawlerError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] scheduler::SchedulerError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Callboard operations
pub type Result<T> = std::result::Result<T, CallboardError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{CrawlJob, DataSource, JobStatus, RawRecord, SubmissionRecord, SubmissionType};
pub use scheduler::Scheduler;
