//! Crawler module: fetching, crawler registry and job orchestration
//!
//! This module contains the crawl path, including:
//! - HTTP fetching with pacing and retry logic
//! - The `Crawler` capability and the name-to-factory registry
//! - Job tracking around every crawl attempt
//! - The built-in `demo` and `json-feed` crawlers

mod coordinator;
mod demo;
mod feed;
mod fetcher;
mod registry;

pub use coordinator::{Coordinator, JobReport, RunAllSummary};
pub use demo::DemoCrawler;
pub use feed::JsonFeedCrawler;
pub use fetcher::{build_http_client, FetchClient, FetchError, FetchPolicy};
pub use registry::{CrawlCounts, Crawler, CrawlerContext, CrawlerRegistry, UnknownCrawlerError};
