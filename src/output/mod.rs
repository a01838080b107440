//! Output module for reporting on crawl jobs
//!
//! This module handles the read-only report surface over the job store.

pub mod stats;

pub use stats::{format_statistics, load_job_statistics, print_statistics, JobStatistics};
