//! Domain model shared by the scheduler, job store and record pipeline
//!
//! # Components
//!
//! - `DataSource`: a configured origin to poll, with its due-time rule
//! - `CrawlJob` / `JobStatus`: one tracked crawl attempt and its lifecycle
//! - `RawRecord` / `SubmissionRecord`: an open-call listing before and after normalization

mod job;
mod source;
mod submission;

pub use job::{CrawlJob, JobStatus, JobUpdate};
pub use source::{DataSource, SourceKind};
pub use submission::{NewSubmission, RawRecord, SubmissionRecord, SubmissionType};
