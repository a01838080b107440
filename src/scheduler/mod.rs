//! Scheduler for recurring crawls and maintenance
//!
//! This module handles:
//! - Holding the in-memory list of data sources, reloaded from the catalog
//! - Selecting due sources and dispatching their crawlers one at a time
//! - Spacing consecutive dispatches so a check never bursts
//! - Purging old jobs once a day
//! - Starting and stopping the single polling loop that drives all of it

mod tasks;

pub use tasks::{default_cadences, Cadence, TaskKind, TaskTable};

use crate::config::SchedulerConfig;
use crate::crawler::Coordinator;
use crate::model::DataSource;
use crate::storage::{
    lock_store, SharedJobStore, SharedSourceCatalog, StorageError, StoreHandles,
};
use crate::ConfigError;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Errors that can stop a scheduler tick or start
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scheduler state lock poisoned: {0}")]
    StatePoisoned(&'static str),
}

/// Point-in-time view of the scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerStatus {
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub source_count: usize,
    pub active_source_count: usize,
    pub next_runs: Vec<(TaskKind, DateTime<Utc>)>,
}

/// State shared between the scheduler handle and its polling loop
struct Shared {
    config: SchedulerConfig,
    seed_sources: Vec<DataSource>,
    catalog: SharedSourceCatalog,
    jobs: SharedJobStore,
    coordinator: Coordinator,
    sources: RwLock<Vec<DataSource>>,
    tasks: Mutex<TaskTable>,
    shutdown: watch::Sender<bool>,
}

struct RunningLoop {
    handle: JoinHandle<()>,
    started_at: DateTime<Utc>,
}

/// Drives recurring crawls of the configured data sources
///
/// `start` spawns one polling loop; every wake-up it runs whichever recurring
/// tasks are due. Crawls dispatched by one check run serially.
pub struct Scheduler {
    shared: Arc<Shared>,
    cadences: Vec<(TaskKind, Cadence)>,
    running: Option<RunningLoop>,
}

impl Scheduler {
    /// Creates a stopped scheduler
    ///
    /// # Arguments
    ///
    /// * `config` - Loop cadence, spacing and retention settings
    /// * `seed_sources` - Sources written into the catalog on every start
    /// * `stores` - Job store and source catalog handles
    /// * `coordinator` - Runs each dispatched crawler as a tracked job
    pub fn new(
        config: SchedulerConfig,
        seed_sources: Vec<DataSource>,
        stores: &StoreHandles,
        coordinator: Coordinator,
    ) -> Result<Self, SchedulerError> {
        let cadences = default_cadences(&config)?;
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                seed_sources,
                catalog: stores.sources.clone(),
                jobs: stores.jobs.clone(),
                coordinator,
                sources: RwLock::new(Vec::new()),
                tasks: Mutex::new(TaskTable::default()),
                shutdown,
            }),
            cadences,
            running: None,
        })
    }

    /// Replaces the recurring task cadences used by the next `start`
    pub fn with_cadences(mut self, cadences: Vec<(TaskKind, Cadence)>) -> Self {
        self.cadences = cadences;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Loads sources, registers the recurring tasks and spawns the polling loop
    ///
    /// Calling `start` on a running scheduler does nothing.
    pub async fn start(&mut self) -> Result<(), SchedulerError> {
        if self.is_running() {
            tracing::warn!("Scheduler is already running");
            return Ok(());
        }

        self.shared.seed_catalog()?;
        self.shared.reload_sources()?;

        let now = Utc::now();
        *self.shared.lock_tasks()? = TaskTable::new(now, &self.cadences);
        self.shared.shutdown.send_replace(false);

        let shutdown = self.shared.shutdown.subscribe();
        let handle = tokio::spawn(run_loop(self.shared.clone(), shutdown));
        self.running = Some(RunningLoop {
            handle,
            started_at: now,
        });

        tracing::info!(
            "Scheduler started with {} recurring tasks",
            self.cadences.len()
        );
        Ok(())
    }

    /// Signals the loop to exit and waits for it, aborting it after the stop timeout
    ///
    /// A crawl in flight is not interrupted unless the timeout expires; its
    /// job is then marked failed.
    pub async fn stop(&mut self) {
        let Some(mut running) = self.running.take() else {
            tracing::warn!("Scheduler is not running");
            return;
        };

        self.shared.shutdown.send_replace(true);

        let timeout = self.shared.config.stop_timeout();
        match tokio::time::timeout(timeout, &mut running.handle).await {
            Ok(Ok(())) => tracing::info!("Scheduler stopped"),
            Ok(Err(e)) => tracing::error!("Scheduler loop ended abnormally: {}", e),
            Err(_) => {
                tracing::warn!(
                    "Scheduler loop did not stop within {:?}, aborting",
                    timeout
                );
                running.handle.abort();
                // Wait for the abort so interrupted jobs are already marked failed
                let _ = running.handle.await;
            }
        }
    }

    /// Runs a due-source check immediately, outside the recurring cadence
    ///
    /// # Returns
    ///
    /// The number of sources dispatched
    pub async fn dispatch_now(&self) -> Result<usize, SchedulerError> {
        let mut shutdown = self.shared.shutdown.subscribe();
        self.shared.dispatch_due(&mut shutdown).await
    }

    /// Re-reads the source list from the catalog
    pub fn reload_sources(&self) -> Result<usize, SchedulerError> {
        self.shared.reload_sources()
    }

    /// Copies of the sources currently held in memory
    pub fn sources(&self) -> Vec<DataSource> {
        self.shared
            .sources
            .read()
            .map(|sources| sources.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn status(&self) -> SchedulerStatus {
        let sources = self.sources();
        let next_runs = self
            .shared
            .tasks
            .lock()
            .map(|tasks| tasks.next_runs())
            .unwrap_or_else(|poisoned| poisoned.into_inner().next_runs());

        SchedulerStatus {
            running: self.is_running(),
            started_at: self.running.as_ref().map(|running| running.started_at),
            source_count: sources.len(),
            active_source_count: sources.iter().filter(|s| s.active).count(),
            next_runs,
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.running.is_some() {
            self.shared.shutdown.send_replace(true);
        }
    }
}

impl Shared {
    fn lock_tasks(&self) -> Result<std::sync::MutexGuard<'_, TaskTable>, SchedulerError> {
        self.tasks
            .lock()
            .map_err(|_| SchedulerError::StatePoisoned("task table"))
    }

    /// Writes the configured sources into the catalog, keeping their crawl history
    fn seed_catalog(&self) -> Result<(), SchedulerError> {
        if self.seed_sources.is_empty() {
            return Ok(());
        }

        let mut catalog = lock_store(&self.catalog, "source catalog")?;
        for source in &self.seed_sources {
            catalog.upsert_source(source)?;
        }
        tracing::debug!("Seeded {} sources into the catalog", self.seed_sources.len());
        Ok(())
    }

    /// Replaces the in-memory source list wholesale
    fn reload_sources(&self) -> Result<usize, SchedulerError> {
        let loaded = lock_store(&self.catalog, "source catalog")?.load_sources()?;
        let count = loaded.len();

        *self
            .sources
            .write()
            .map_err(|_| SchedulerError::StatePoisoned("source list"))? = loaded;

        tracing::info!("Loaded {} data sources", count);
        Ok(count)
    }

    fn purge_jobs(&self) -> Result<usize, SchedulerError> {
        let days = self.config.retention_days;
        let removed = lock_store(&self.jobs, "job store")?.purge_older_than(days)?;
        tracing::info!("Purged {} jobs older than {} days", removed, days);
        Ok(removed)
    }

    /// Runs every recurring task due at `now`
    ///
    /// All due tasks run even if one fails; the first error is returned so
    /// the loop backs off.
    async fn tick(
        &self,
        now: DateTime<Utc>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), SchedulerError> {
        let due = self.lock_tasks()?.take_due(now);
        let mut first_error = None;

        for kind in due {
            if stop_requested(shutdown) {
                break;
            }

            tracing::debug!(task = %kind, "Running recurring task");
            let result = match kind {
                TaskKind::DispatchDue => self.dispatch_due(shutdown).await.map(|_| ()),
                TaskKind::ReloadSources => self.reload_sources().map(|_| ()),
                TaskKind::PurgeJobs => self.purge_jobs().map(|_| ()),
            };

            if let Err(e) = result {
                tracing::error!(task = %kind, "Recurring task failed: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Crawls every due source in turn, spacing consecutive dispatches
    async fn dispatch_due(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<usize, SchedulerError> {
        let now = Utc::now();
        let due: Vec<DataSource> = self
            .sources
            .read()
            .map_err(|_| SchedulerError::StatePoisoned("source list"))?
            .iter()
            .filter(|source| source.is_due(now))
            .cloned()
            .collect();

        if due.is_empty() {
            tracing::debug!("No sources due");
            return Ok(0);
        }

        tracing::info!("{} sources due for crawling", due.len());

        let spacing = self.config.dispatch_spacing();
        let mut dispatched = 0;

        for (index, source) in due.into_iter().enumerate() {
            if index > 0 && sleep_or_shutdown(spacing, shutdown).await {
                break;
            }
            if stop_requested(shutdown) {
                break;
            }

            let source_id = source.id.clone();
            let crawler = source.crawler_name.clone();
            dispatched += 1;

            match self.coordinator.run_crawler(&crawler, Some(source)).await {
                Ok(report) if report.succeeded() => self.mark_crawled(&source_id, Utc::now()),
                Ok(_) => {}
                Err(e) => tracing::error!(
                    source = %source_id,
                    crawler = %crawler,
                    "Dispatch abandoned: {}",
                    e
                ),
            }
        }

        Ok(dispatched)
    }

    /// Advances `last_crawled_at` in memory and in the catalog
    fn mark_crawled(&self, source_id: &str, at: DateTime<Utc>) {
        match self.sources.write() {
            Ok(mut sources) => {
                if let Some(source) = sources.iter_mut().find(|s| s.id == source_id) {
                    source.last_crawled_at = Some(at);
                }
            }
            Err(_) => tracing::error!("Source list lock poisoned, crawl time not recorded"),
        }

        let persisted = lock_store(&self.catalog, "source catalog")
            .and_then(|mut catalog| catalog.mark_source_crawled(source_id, at));
        if let Err(e) = persisted {
            tracing::warn!(source = %source_id, "Could not persist crawl time: {}", e);
        }
    }
}

/// The polling loop: tick, then sleep until the next wake-up or a stop request
async fn run_loop(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    tracing::debug!("Scheduler loop started");

    loop {
        if stop_requested(&shutdown) {
            break;
        }

        let pause = match shared.tick(Utc::now(), &mut shutdown).await {
            Ok(()) => shared.config.poll_interval(),
            Err(e) => {
                tracing::error!("Scheduler tick failed, backing off: {}", e);
                shared.config.error_backoff()
            }
        };

        if sleep_or_shutdown(pause, &mut shutdown).await {
            break;
        }
    }

    tracing::debug!("Scheduler loop exited");
}

fn stop_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Sleeps for `duration`; returns true if a stop was requested meanwhile
async fn sleep_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if stop_requested(shutdown) {
        return true;
    }

    tokio::select! {
        _ = tokio::time::sleep(duration) => stop_requested(shutdown),
        changed = shutdown.changed() => changed.is_err() || stop_requested(shutdown),
    }
}
