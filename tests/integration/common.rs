use callboard::config::UserAgentConfig;
use callboard::crawler::{
    build_http_client, Coordinator, CrawlerRegistry, FetchClient, FetchPolicy,
};
use callboard::model::{DataSource, SourceKind};
use callboard::storage::{SqliteStorage, StoreHandles};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub fn test_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// A policy with no pacing and millisecond backoff
pub fn fast_policy(max_retries: u32) -> FetchPolicy {
    FetchPolicy {
        request_delay: Duration::ZERO,
        jitter: Duration::ZERO,
        timeout: Duration::from_secs(5),
        max_retries,
        backoff_base: Duration::from_millis(1),
    }
}

pub fn fast_fetcher(max_retries: u32) -> FetchClient {
    let policy = fast_policy(max_retries);
    let client = build_http_client(&test_user_agent(), policy.timeout).unwrap();
    FetchClient::new(client, policy)
}

/// An on-disk database in its own temporary directory
pub struct TestDb {
    pub dir: TempDir,
    pub storage: Arc<Mutex<SqliteStorage>>,
    pub stores: StoreHandles,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::new(&dir.path().join("callboard.db")).unwrap();
        let storage = Arc::new(Mutex::new(storage));
        let stores = StoreHandles::from_shared(storage.clone());
        Self {
            dir,
            storage,
            stores,
        }
    }

    pub fn coordinator(&self, fetcher: FetchClient) -> Coordinator {
        Coordinator::new(
            &self.stores,
            Arc::new(CrawlerRegistry::with_defaults()),
            fetcher,
        )
    }
}

pub fn source(id: &str, crawler: &str, url: &str, config: serde_json::Value) -> DataSource {
    DataSource {
        id: id.to_string(),
        name: format!("Source {}", id),
        url: url.to_string(),
        kind: SourceKind::Api,
        crawler_name: crawler.to_string(),
        frequency_hours: 24,
        active: true,
        last_crawled_at: None,
        config,
    }
}
