//! Callboard main entry point
//!
//! This is the command-line interface for the Callboard open-call ingestion service.

use callboard::config::{load_config_with_hash, Config};
use callboard::crawler::{Coordinator, CrawlerRegistry, FetchClient, JobReport};
use callboard::model::DataSource;
use callboard::output::{load_job_statistics, print_statistics};
use callboard::storage::{lock_store, open_storage, StoreHandles};
use callboard::{CallboardError, Scheduler};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Callboard: open-call crawl scheduler and ingestion pipeline
///
/// Callboard polls configured data sources, runs the crawler bound to each
/// due source, and stores every listing it finds, deduplicated on title and
/// organizer. Every crawl attempt is tracked as a job.
#[derive(Parser, Debug)]
#[command(name = "callboard")]
#[command(version)]
#[command(about = "Open-call crawl scheduler and ingestion pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List known crawlers and configured sources
    List,

    /// Run one crawler as a tracked job
    Run {
        /// Registered crawler name
        #[arg(long)]
        crawler: String,

        /// Configured source to crawl (its URL and settings are passed to the crawler)
        #[arg(long)]
        source: Option<String>,
    },

    /// Run every registered crawler in turn
    RunAll,

    /// Print job statistics for a UTC day
    Stats {
        /// Day to report, YYYY-MM-DD (default: today)
        #[arg(long, value_parser = parse_day)]
        date: Option<NaiveDate>,
    },

    /// Delete jobs created more than N days ago
    Purge {
        #[arg(long)]
        days: u32,
    },

    /// Run the scheduler until interrupted with Ctrl-C
    Schedule,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let app = App::build(config)?;

    match cli.command {
        Command::List => app.handle_list(),
        Command::Run { crawler, source } => app.handle_run(&crawler, source.as_deref()).await?,
        Command::RunAll => app.handle_run_all().await?,
        Command::Stats { date } => app.handle_stats(date)?,
        Command::Purge { days } => app.handle_purge(days)?,
        Command::Schedule => app.handle_schedule().await?,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("callboard=info,warn"),
            1 => EnvFilter::new("callboard=debug,info"),
            2 => EnvFilter::new("callboard=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn parse_day(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

/// Everything a command needs, wired once from configuration
struct App {
    config: Config,
    sources: Vec<DataSource>,
    stores: StoreHandles,
    registry: Arc<CrawlerRegistry>,
    fetcher: FetchClient,
}

impl App {
    fn build(config: Config) -> Result<Self, CallboardError> {
        let sources = config
            .sources
            .iter()
            .map(DataSource::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let storage = open_storage(Path::new(&config.storage.database_path))?;
        let stores = StoreHandles::from_sqlite(storage);

        let registry = Arc::new(CrawlerRegistry::with_defaults());
        for source in &sources {
            if !registry.contains(&source.crawler_name) {
                tracing::warn!(
                    "Source '{}' is bound to unknown crawler '{}'; its jobs will fail",
                    source.id,
                    source.crawler_name
                );
            }
        }

        let fetcher = FetchClient::from_config(&config.user_agent, &config.fetch)?;

        Ok(Self {
            config,
            sources,
            stores,
            registry,
            fetcher,
        })
    }

    fn coordinator(&self) -> Coordinator {
        Coordinator::new(&self.stores, self.registry.clone(), self.fetcher.clone())
    }

    /// Handles `list`: registered crawlers and configured sources
    fn handle_list(&self) {
        println!("Crawlers:");
        for (name, description) in self.registry.list() {
            println!("  {:<12} {}", name, description);
        }

        println!("\nSources ({}):", self.sources.len());
        for source in &self.sources {
            println!(
                "  {} ({}) -> {}, every {}h{}",
                source.id,
                source.kind,
                source.crawler_name,
                source.frequency_hours,
                if source.active { "" } else { ", inactive" }
            );
        }
    }

    /// Handles `run`: one tracked crawl, optionally bound to a configured source
    async fn handle_run(
        &self,
        crawler: &str,
        source_id: Option<&str>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let source = match source_id {
            Some(id) => Some(
                self.sources
                    .iter()
                    .find(|s| s.id == id)
                    .cloned()
                    .ok_or_else(|| format!("No source with id '{}' in configuration", id))?,
            ),
            None => None,
        };

        let report = self.coordinator().run_crawler(crawler, source).await?;
        print_report(&report);

        if report.succeeded() {
            Ok(())
        } else {
            Err(format!("Crawl job {} failed", report.job_id).into())
        }
    }

    /// Handles `run-all`: every registered crawler, in name order
    async fn handle_run_all(&self) -> Result<(), Box<dyn std::error::Error>> {
        let summary = self.coordinator().run_all().await;

        for report in &summary.reports {
            print_report(report);
        }
        println!("\n{}/{} crawlers succeeded", summary.succeeded, summary.total);

        if summary.succeeded == summary.total {
            Ok(())
        } else {
            Err("Not every crawler succeeded".into())
        }
    }

    /// Handles `stats`: per-status job counts for one day
    fn handle_stats(&self, date: Option<NaiveDate>) -> Result<(), CallboardError> {
        let day = date.unwrap_or_else(|| Utc::now().date_naive());
        println!("Database: {}\n", self.config.storage.database_path);

        let stats = {
            let jobs = lock_store(&self.stores.jobs, "job store")?;
            load_job_statistics(&*jobs, day)?
        };
        print_statistics(&stats);
        Ok(())
    }

    /// Handles `purge`: retention cleanup on demand
    fn handle_purge(&self, days: u32) -> Result<(), CallboardError> {
        let removed = lock_store(&self.stores.jobs, "job store")?.purge_older_than(days)?;
        println!("Purged {} jobs older than {} days", removed, days);
        Ok(())
    }

    /// Handles `schedule`: run the scheduler until Ctrl-C
    async fn handle_schedule(self) -> Result<(), CallboardError> {
        let coordinator = self.coordinator();
        let mut scheduler = Scheduler::new(
            self.config.scheduler.clone(),
            self.sources,
            &self.stores,
            coordinator,
        )?;

        scheduler.start().await?;

        let status = scheduler.status();
        println!(
            "Scheduler running: {} sources ({} active)",
            status.source_count, status.active_source_count
        );
        for (task, at) in &status.next_runs {
            println!("  next {}: {}", task, at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        println!("Press Ctrl-C to stop");

        tokio::signal::ctrl_c().await?;
        tracing::info!("Interrupt received, stopping scheduler");
        scheduler.stop().await;

        Ok(())
    }
}

fn print_report(report: &JobReport) {
    println!(
        "Job {} [{}] {} for '{}': {} found, {} added in {:.2}s",
        report.job_id,
        report.crawler,
        report.status,
        report.source_label,
        report.counts.items_found,
        report.counts.items_added,
        report.elapsed.as_secs_f64()
    );
    if let Some(error) = &report.error {
        println!("  error: {}", error);
    }
}
