//! End-to-end crawl jobs: feed ingestion, deduplication, failure tracking and retention

use crate::common::{fast_fetcher, source, TestDb};
use callboard::model::{JobStatus, SubmissionType};
use callboard::output::load_job_statistics;
use callboard::storage::{JobStore, SubmissionStore};
use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn feed_body() -> serde_json::Value {
    json!({
        "items": [
            {
                "title": "  Spring   Salon 2025 ",
                "description": "Annual juried exhibition of works on paper",
                "type": "EXHIBITION",
                "organizer": "Harbor Arts Council",
                "deadline": "2031-04-15",
                "contact": "Email salon@harborarts.org or call (555) 123-4567",
                "fee": "25",
                "tags": ["paper", "", "juried"]
            },
            {
                "title": "Mountain Studio Fellowship",
                "description": "Six week artist residency with housing",
                "type": "OTHER",
                "organizer": "Alpine Foundation",
                "deadline": "not a date"
            },
            { "title": "   ", "organizer": "Nobody" },
            42
        ],
        "total": 4
    })
}

async fn mount_feed(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/feed.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_feed_crawl_completes_and_normalizes() {
    let server = MockServer::start().await;
    mount_feed(&server, feed_body()).await;

    let db = TestDb::new();
    let coordinator = db.coordinator(fast_fetcher(0));
    let feed = source(
        "harbor",
        "json-feed",
        &format!("{}/feed.json", server.uri()),
        json!(null),
    );

    let report = coordinator
        .run_crawler("json-feed", Some(feed))
        .await
        .unwrap();

    assert_eq!(report.status, JobStatus::Completed);
    assert_eq!(report.source_label, "Source harbor");
    assert_eq!(report.counts.items_found, 4);
    assert_eq!(report.counts.items_added, 2);

    let storage = db.storage.lock().unwrap();
    let job = storage.get_job(report.job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.items_found, 4);
    assert_eq!(job.items_added, 2);
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());

    assert_eq!(storage.count_submissions().unwrap(), 2);

    let salon = storage
        .get_submission_by_key("Spring Salon 2025", "Harbor Arts Council")
        .unwrap()
        .expect("cleaned title is the dedup key");
    assert_eq!(salon.submission_type, SubmissionType::Exhibition);
    assert_eq!(salon.deadline.to_string(), "2031-04-15");
    assert_eq!(salon.email.as_deref(), Some("salon@harborarts.org"));
    assert_eq!(salon.phone.as_deref(), Some("5551234567"));
    assert_eq!(salon.fee, Some(25.0));
    assert_eq!(salon.tags, vec!["paper".to_string(), "juried".to_string()]);

    let fellowship = storage
        .get_submission_by_key("Mountain Studio Fellowship", "Alpine Foundation")
        .unwrap()
        .unwrap();
    // OTHER is reclassified from the text
    assert_eq!(fellowship.submission_type, SubmissionType::Residency);
    // Unparseable deadline falls back to roughly a month out
    let days_out = (fellowship.deadline - Utc::now().date_naive()).num_days();
    assert!((29..=31).contains(&days_out), "deadline {} days out", days_out);
}

#[tokio::test]
async fn test_recrawl_updates_instead_of_duplicating() {
    let server = MockServer::start().await;
    mount_feed(&server, feed_body()).await;

    let db = TestDb::new();
    let coordinator = db.coordinator(fast_fetcher(0));
    let feed = source(
        "harbor",
        "json-feed",
        &format!("{}/feed.json", server.uri()),
        json!(null),
    );

    let first = coordinator
        .run_crawler("json-feed", Some(feed.clone()))
        .await
        .unwrap();
    let second = coordinator
        .run_crawler("json-feed", Some(feed))
        .await
        .unwrap();

    assert_ne!(first.job_id, second.job_id);
    assert_eq!(second.status, JobStatus::Completed);

    let storage = db.storage.lock().unwrap();
    assert_eq!(storage.count_submissions().unwrap(), 2);
    assert_eq!(storage.count_jobs().unwrap(), 2);
}

#[tokio::test]
async fn test_custom_items_key() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        json!({"calls": [{"title": "Print Biennial", "organizer": "Ink Society"}]}),
    )
    .await;

    let db = TestDb::new();
    let coordinator = db.coordinator(fast_fetcher(0));
    let feed = source(
        "ink",
        "json-feed",
        &format!("{}/feed.json", server.uri()),
        json!({"items-key": "calls"}),
    );

    let report = coordinator
        .run_crawler("json-feed", Some(feed))
        .await
        .unwrap();

    assert!(report.succeeded());
    assert_eq!(report.counts.items_found, 1);
    assert_eq!(report.counts.items_added, 1);
}

#[tokio::test]
async fn test_non_text_scalars_do_not_drop_listings() {
    let server = MockServer::start().await;
    mount_feed(
        &server,
        json!([
            {"title": "Print Prize", "organizer": "Ink", "prize": 5000},
            {"title": "Photo Call", "organizer": "Lens", "deadline": 20300101}
        ]),
    )
    .await;

    let db = TestDb::new();
    let coordinator = db.coordinator(fast_fetcher(0));
    let feed = source(
        "mixed",
        "json-feed",
        &format!("{}/feed.json", server.uri()),
        json!(null),
    );

    let report = coordinator
        .run_crawler("json-feed", Some(feed))
        .await
        .unwrap();

    assert_eq!(report.status, JobStatus::Completed);
    assert_eq!(report.counts.items_found, 2);
    assert_eq!(report.counts.items_added, 2);

    let storage = db.storage.lock().unwrap();
    assert_eq!(storage.count_submissions().unwrap(), 2);
    let prize = storage
        .get_submission_by_key("Print Prize", "Ink")
        .unwrap()
        .unwrap();
    assert_eq!(prize.prize, "5000");
    let photo = storage
        .get_submission_by_key("Photo Call", "Lens")
        .unwrap()
        .unwrap();
    // An undated integer falls back like any unparsable deadline
    let days_out = (photo.deadline - Utc::now().date_naive()).num_days();
    assert!((29..=31).contains(&days_out), "deadline {} days out", days_out);
}

#[tokio::test]
async fn test_unreachable_feed_fails_job_with_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&server)
        .await;

    let db = TestDb::new();
    let coordinator = db.coordinator(fast_fetcher(1));
    let feed = source(
        "down",
        "json-feed",
        &format!("{}/feed.json", server.uri()),
        json!(null),
    );

    let report = coordinator
        .run_crawler("json-feed", Some(feed))
        .await
        .unwrap();

    assert_eq!(report.status, JobStatus::Failed);
    let error = report.error.clone().unwrap();
    assert!(error.contains("after 2 attempt(s)"), "error was: {}", error);

    let job = db.storage.lock().unwrap().get_job(report.job_id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_message.as_deref(), Some(error.as_str()));
    assert_eq!(job.items_found, 0);
    assert!(job.completed_at.is_some());
}

#[tokio::test]
async fn test_invalid_json_fails_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let db = TestDb::new();
    let coordinator = db.coordinator(fast_fetcher(0));
    let feed = source("html", "json-feed", &server.uri(), json!(null));

    let report = coordinator
        .run_crawler("json-feed", Some(feed))
        .await
        .unwrap();

    assert_eq!(report.status, JobStatus::Failed);
    assert!(report.error.unwrap().contains("invalid JSON"));
}

#[tokio::test]
async fn test_demo_crawl_and_daily_stats() {
    let db = TestDb::new();
    let coordinator = db.coordinator(fast_fetcher(0));
    let demo = source("demo", "demo", "", json!({"item-delay-ms": 0, "seed": 11}));

    let ok = coordinator
        .run_crawler("demo", Some(demo))
        .await
        .unwrap();
    let missing = coordinator.run_crawler("no-such-crawler", None).await.unwrap();

    assert_eq!(ok.status, JobStatus::Completed);
    assert!(ok.counts.items_found >= 3);
    assert_eq!(ok.counts.items_added, ok.counts.items_found);
    assert_eq!(missing.status, JobStatus::Failed);
    assert_eq!(missing.source_label, "no-such-crawler");

    let storage = db.storage.lock().unwrap();
    let stats = load_job_statistics(&*storage, Utc::now().date_naive()).unwrap();
    assert_eq!(stats.total_jobs(), 2);
    assert_eq!(stats.jobs_with(JobStatus::Completed), 1);
    assert_eq!(stats.jobs_with(JobStatus::Failed), 1);
    assert_eq!(stats.items_found(), ok.counts.items_found);
}

#[test]
fn test_purge_keeps_recent_jobs() {
    let db = TestDb::new();
    let now = Utc::now();
    let mut storage = db.storage.lock().unwrap();

    storage.create_job_at("ancient", now - Duration::days(30)).unwrap();
    storage.create_job_at("old", now - Duration::days(8)).unwrap();
    let recent = storage.create_job_at("recent", now - Duration::days(6)).unwrap();
    let today = storage.create_job("today").unwrap();

    let removed = storage.purge_older_than_at(7, now).unwrap();

    assert_eq!(removed, 2);
    assert_eq!(storage.count_jobs().unwrap(), 2);
    assert!(storage.get_job(recent).is_ok());
    assert!(storage.get_job(today).is_ok());
}
