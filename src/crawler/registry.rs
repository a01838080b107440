//! Crawler capability and the name-to-factory registry

use crate::crawler::demo::DemoCrawler;
use crate::crawler::feed::JsonFeedCrawler;
use crate::crawler::FetchClient;
use crate::model::DataSource;
use crate::pipeline::{IngestError, RecordPipeline};
use crate::storage::UpsertOutcome;
use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// Returned when no crawler is registered under a name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown crawler: {name}")]
pub struct UnknownCrawlerError {
    pub name: String,
}

/// Found/added tally reported by a crawler run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlCounts {
    /// Raw records observed
    pub items_found: u64,
    /// Records created or refreshed in the store
    pub items_added: u64,
}

impl CrawlCounts {
    /// Tallies one ingestion result
    ///
    /// Every record counts as found. Rejected or unstorable records are logged
    /// and otherwise ignored.
    pub fn record(&mut self, result: Result<UpsertOutcome, IngestError>) {
        self.items_found += 1;
        match result {
            Ok(_) => self.items_added += 1,
            Err(e) => tracing::warn!("Skipping record: {}", e),
        }
    }
}

/// A unit that discovers raw records and drives them through the pipeline
#[async_trait]
pub trait Crawler: Send {
    /// Logical name this crawler is registered under
    fn name(&self) -> &str;

    /// Runs the crawl end-to-end and reports its counts
    async fn run(&mut self) -> anyhow::Result<CrawlCounts>;
}

/// Dependencies handed to a crawler factory
#[derive(Clone)]
pub struct CrawlerContext {
    pub pipeline: RecordPipeline,
    pub fetcher: FetchClient,
    /// The source being crawled; `None` for ad-hoc runs
    pub source: Option<DataSource>,
}

type CrawlerFactory = Box<dyn Fn(CrawlerContext) -> Box<dyn Crawler> + Send + Sync>;

struct Registration {
    description: &'static str,
    factory: CrawlerFactory,
}

/// Maps logical crawler names to constructors
///
/// Built once at start-up; holds no other state.
#[derive(Default)]
pub struct CrawlerRegistry {
    crawlers: BTreeMap<String, Registration>,
}

impl CrawlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in crawler
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            DemoCrawler::NAME,
            "Synthetic open-call listings for trying out the pipeline",
            |ctx| Box::new(DemoCrawler::new(ctx)),
        );
        registry.register(
            JsonFeedCrawler::NAME,
            "JSON array of raw records served at the source URL",
            |ctx| Box::new(JsonFeedCrawler::new(ctx)),
        );
        registry
    }

    /// Registers a factory, replacing any previous one with the same name
    pub fn register<F>(&mut self, name: &str, description: &'static str, factory: F)
    where
        F: Fn(CrawlerContext) -> Box<dyn Crawler> + Send + Sync + 'static,
    {
        self.crawlers.insert(
            name.to_string(),
            Registration {
                description,
                factory: Box::new(factory),
            },
        );
    }

    /// Builds the crawler registered under `name`
    pub fn resolve(
        &self,
        name: &str,
        ctx: CrawlerContext,
    ) -> Result<Box<dyn Crawler>, UnknownCrawlerError> {
        self.crawlers
            .get(name)
            .map(|registration| (registration.factory)(ctx))
            .ok_or_else(|| UnknownCrawlerError {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.crawlers.contains_key(name)
    }

    /// Registered names with their descriptions, sorted by name
    pub fn list(&self) -> Vec<(&str, &'static str)> {
        self.crawlers
            .iter()
            .map(|(name, registration)| (name.as_str(), registration.description))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::FetchPolicy;
    use crate::pipeline::ValidationError;
    use crate::storage::SqliteStorage;
    use std::sync::{Arc, Mutex};

    struct Fixed(CrawlCounts);

    #[async_trait]
    impl Crawler for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn run(&mut self) -> anyhow::Result<CrawlCounts> {
            Ok(self.0)
        }
    }

    fn context() -> CrawlerContext {
        let storage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
        CrawlerContext {
            pipeline: RecordPipeline::new(storage),
            fetcher: FetchClient::new(reqwest::Client::new(), FetchPolicy::default()),
            source: None,
        }
    }

    #[tokio::test]
    async fn test_resolve_registered_crawler() {
        let mut registry = CrawlerRegistry::new();
        registry.register("fixed", "always the same", |_| {
            Box::new(Fixed(CrawlCounts {
                items_found: 5,
                items_added: 3,
            }))
        });

        let mut crawler = registry.resolve("fixed", context()).unwrap();
        let counts = crawler.run().await.unwrap();

        assert_eq!(crawler.name(), "fixed");
        assert_eq!(counts.items_found, 5);
        assert_eq!(counts.items_added, 3);
    }

    #[test]
    fn test_unknown_crawler() {
        let registry = CrawlerRegistry::with_defaults();
        let err = registry.resolve("nope", context()).err().unwrap();
        assert_eq!(err.name, "nope");
        assert_eq!(err.to_string(), "Unknown crawler: nope");
    }

    #[test]
    fn test_defaults_are_listed_in_order() {
        let registry = CrawlerRegistry::with_defaults();
        let names: Vec<_> = registry.list().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["demo", "json-feed"]);
        assert!(registry.contains("demo"));
    }

    #[test]
    fn test_counts_tally() {
        let mut counts = CrawlCounts::default();
        counts.record(Ok(UpsertOutcome::Created(1)));
        counts.record(Ok(UpsertOutcome::Updated(1)));
        counts.record(Err(IngestError::Validation(ValidationError::EmptyTitle)));

        assert_eq!(
            counts,
            CrawlCounts {
                items_found: 3,
                items_added: 2
            }
        );
    }
}
