//! Crawler coordinator - job orchestration around a single crawl
//!
//! This module wraps every crawl attempt in a tracked job:
//! - Creating the `pending` job row (or abandoning the attempt if that fails)
//! - Marking it `running` and resolving the bound crawler
//! - Running the crawler on its own task so a panic is captured as an error
//! - Recording exactly one terminal status, even if the caller is cancelled

use crate::crawler::{CrawlCounts, CrawlerContext, CrawlerRegistry, FetchClient};
use crate::model::{DataSource, JobStatus, JobUpdate};
use crate::pipeline::RecordPipeline;
use crate::storage::{lock_store, SharedJobStore, StorageResult, StoreHandles};
use anyhow::anyhow;
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::AbortHandle;
use tracing::Instrument;

/// What happened to one tracked crawl
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub job_id: i64,
    pub crawler: String,
    pub source_label: String,
    pub status: JobStatus,
    pub counts: CrawlCounts,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

/// Outcome of running every registered crawler
#[derive(Debug, Clone, Default)]
pub struct RunAllSummary {
    pub total: usize,
    pub succeeded: usize,
    pub reports: Vec<JobReport>,
}

/// Marks its job `failed` on drop unless a terminal status was recorded
///
/// Also aborts the crawler task it watches, so a cancelled dispatch does not
/// leave a detached crawl writing listings.
struct JobGuard {
    jobs: SharedJobStore,
    job_id: i64,
    finished: bool,
    crawl_task: Option<AbortHandle>,
}

impl JobGuard {
    fn new(jobs: SharedJobStore, job_id: i64) -> Self {
        Self {
            jobs,
            job_id,
            finished: false,
            crawl_task: None,
        }
    }

    fn apply(&self, update: &JobUpdate) -> StorageResult<()> {
        lock_store(&self.jobs, "job store")?.update_job(self.job_id, update)
    }

    fn mark_running(&self) -> StorageResult<()> {
        self.apply(&JobUpdate::running())
    }

    fn watch(&mut self, task: AbortHandle) {
        self.crawl_task = Some(task);
    }

    /// Records a terminal update; the guard is disarmed only if it was stored
    fn finish(&mut self, update: &JobUpdate) -> StorageResult<()> {
        self.apply(update)?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        if let Some(task) = self.crawl_task.take() {
            task.abort();
        }

        let update = JobUpdate::failed("crawl interrupted before completion");
        if let Err(e) = self.apply(&update) {
            tracing::error!(
                job_id = self.job_id,
                "Could not record terminal status for interrupted job: {}",
                e
            );
        } else {
            tracing::warn!(job_id = self.job_id, "Job interrupted, marked failed");
        }
    }
}

/// Runs crawlers as tracked jobs
pub struct Coordinator {
    jobs: SharedJobStore,
    registry: Arc<CrawlerRegistry>,
    pipeline: RecordPipeline,
    fetcher: FetchClient,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `stores` - Job and submission stores to write through
    /// * `registry` - Crawlers available by name
    /// * `fetcher` - HTTP client handed to every crawler
    pub fn new(
        stores: &StoreHandles,
        registry: Arc<CrawlerRegistry>,
        fetcher: FetchClient,
    ) -> Self {
        Self {
            jobs: stores.jobs.clone(),
            registry,
            pipeline: RecordPipeline::new(stores.submissions.clone()),
            fetcher,
        }
    }

    /// Runs one crawler as a tracked job
    ///
    /// The job is labelled with the source name, or the crawler name for
    /// ad-hoc runs. Crawler failures, panics and unknown names all end in a
    /// `failed` job and are reported, not returned.
    ///
    /// # Returns
    ///
    /// * `Ok(JobReport)` - The job reached a terminal status
    /// * `Err(StorageError)` - No job row could be created; nothing was run
    pub async fn run_crawler(
        &self,
        crawler_name: &str,
        source: Option<DataSource>,
    ) -> StorageResult<JobReport> {
        let started = Instant::now();
        let source_label = source
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| crawler_name.to_string());

        let created =
            lock_store(&self.jobs, "job store").and_then(|mut jobs| jobs.create_job(&source_label));
        let job_id = match created {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    source = %source_label,
                    crawler = crawler_name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Could not create job, abandoning crawl: {}",
                    e
                );
                return Err(e);
            }
        };

        tracing::info!(
            job_id,
            source = %source_label,
            crawler = crawler_name,
            "Starting crawl"
        );

        // Logs from the crawler, pipeline and fetcher inherit these fields
        let span = tracing::info_span!(
            "crawl",
            job_id,
            source = %source_label,
            crawler = crawler_name
        );

        let mut guard = JobGuard::new(self.jobs.clone(), job_id);
        let outcome = self
            .execute(&mut guard, crawler_name, source)
            .instrument(span)
            .await;

        let (counts, error) = match outcome {
            Ok(counts) => {
                match guard.finish(&JobUpdate::completed(counts.items_found, counts.items_added)) {
                    Ok(()) => (counts, None),
                    Err(e) => (counts, Some(format!("could not record completion: {}", e))),
                }
            }
            Err(e) => (CrawlCounts::default(), Some(format!("{:#}", e))),
        };

        let elapsed = started.elapsed();
        let status = match &error {
            None => {
                tracing::info!(
                    job_id,
                    source = %source_label,
                    crawler = crawler_name,
                    elapsed_ms = elapsed.as_millis() as u64,
                    items_found = counts.items_found,
                    items_added = counts.items_added,
                    "Crawl completed"
                );
                JobStatus::Completed
            }
            Some(message) => {
                tracing::error!(
                    job_id,
                    source = %source_label,
                    crawler = crawler_name,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Crawl failed: {}",
                    message
                );
                // On error the guard's drop retries with a generic message
                if let Err(e) = guard.finish(&JobUpdate::failed(message.clone())) {
                    tracing::error!(job_id, "Could not record failure: {}", e);
                }
                JobStatus::Failed
            }
        };

        Ok(JobReport {
            job_id,
            crawler: crawler_name.to_string(),
            source_label,
            status,
            counts,
            error,
            elapsed,
        })
    }

    async fn execute(
        &self,
        guard: &mut JobGuard,
        crawler_name: &str,
        source: Option<DataSource>,
    ) -> anyhow::Result<CrawlCounts> {
        guard.mark_running()?;

        let ctx = CrawlerContext {
            pipeline: self.pipeline.clone(),
            fetcher: self.fetcher.clone(),
            source,
        };
        let mut crawler = self.registry.resolve(crawler_name, ctx)?;

        let task = tokio::spawn(async move { crawler.run().await }.in_current_span());
        guard.watch(task.abort_handle());

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(anyhow!(
                "crawler panicked: {}",
                panic_message(e.into_panic())
            )),
            Err(e) => Err(anyhow!("crawler task ended abnormally: {}", e)),
        }
    }

    /// Runs every registered crawler in turn, without a bound source
    pub async fn run_all(&self) -> RunAllSummary {
        let names: Vec<String> = self
            .registry
            .list()
            .into_iter()
            .map(|(name, _)| name.to_string())
            .collect();

        let mut summary = RunAllSummary {
            total: names.len(),
            ..Default::default()
        };

        for name in names {
            match self.run_crawler(&name, None).await {
                Ok(report) => {
                    if report.succeeded() {
                        summary.succeeded += 1;
                    }
                    summary.reports.push(report);
                }
                Err(e) => tracing::error!(crawler = %name, "Crawler not run: {}", e),
            }
        }

        tracing::info!(
            "Run-all finished: {}/{} crawlers succeeded",
            summary.succeeded,
            summary.total
        );
        summary
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
