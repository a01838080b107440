//! Scheduler dispatch against an on-disk catalog

use crate::common::{fast_fetcher, source, TestDb};
use callboard::config::SchedulerConfig;
use callboard::model::JobStatus;
use callboard::storage::{JobStore, SourceCatalog};
use callboard::Scheduler;
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn quick_config() -> SchedulerConfig {
    SchedulerConfig {
        dispatch_spacing_secs: 0,
        stop_timeout_secs: 5,
        ..SchedulerConfig::default()
    }
}

#[tokio::test]
async fn test_dispatch_runs_due_sources_and_marks_successes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let db = TestDb::new();
    {
        let mut catalog = db.storage.lock().unwrap();
        catalog
            .upsert_source(&source(
                "demo",
                "demo",
                "",
                json!({"item-delay-ms": 0, "seed": 3}),
            ))
            .unwrap();
        catalog
            .upsert_source(&source("broken", "json-feed", &server.uri(), json!(null)))
            .unwrap();
        let mut paused = source("paused", "demo", "", json!({"item-delay-ms": 0}));
        paused.active = false;
        catalog.upsert_source(&paused).unwrap();
    }

    let scheduler = Scheduler::new(
        quick_config(),
        Vec::new(),
        &db.stores,
        db.coordinator(fast_fetcher(0)),
    )
    .unwrap();
    assert_eq!(scheduler.reload_sources().unwrap(), 3);

    assert_eq!(scheduler.dispatch_now().await.unwrap(), 2);

    let sources = db.storage.lock().unwrap().load_sources().unwrap();
    let crawled = |id: &str| {
        sources
            .iter()
            .find(|s| s.id == id)
            .and_then(|s| s.last_crawled_at)
            .is_some()
    };
    assert!(crawled("demo"));
    assert!(!crawled("broken"));
    assert!(!crawled("paused"));

    // The demo source is no longer due; the failed one is retried
    assert_eq!(scheduler.dispatch_now().await.unwrap(), 1);

    let storage = db.storage.lock().unwrap();
    assert_eq!(storage.count_jobs().unwrap(), 3);
    let stats = storage
        .job_stats_for_day(chrono::Utc::now().date_naive())
        .unwrap();
    let failed = stats
        .iter()
        .find(|s| s.status == JobStatus::Failed)
        .map(|s| s.jobs);
    assert_eq!(failed, Some(2));
}

#[tokio::test]
async fn test_start_seeds_catalog_and_stop_is_clean() {
    let db = TestDb::new();
    let seeds = vec![
        source("a", "demo", "", json!({"item-delay-ms": 0})),
        source("b", "json-feed", "https://example.com/feed.json", json!(null)),
    ];

    let mut scheduler = Scheduler::new(
        quick_config(),
        seeds,
        &db.stores,
        db.coordinator(fast_fetcher(0)),
    )
    .unwrap();

    scheduler.start().await.unwrap();
    assert!(scheduler.is_running());

    let status = scheduler.status();
    assert!(status.running);
    assert_eq!(status.source_count, 2);
    assert_eq!(status.active_source_count, 2);
    assert_eq!(status.next_runs.len(), 3);

    scheduler.stop().await;
    assert!(!scheduler.is_running());

    // Nothing was due before the first dispatch interval elapsed
    assert_eq!(db.storage.lock().unwrap().count_jobs().unwrap(), 0);
    assert_eq!(db.storage.lock().unwrap().load_sources().unwrap().len(), 2);
}
