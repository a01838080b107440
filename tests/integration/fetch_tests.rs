//! Retry and backoff behavior of the paced fetcher against a mock server

use crate::common::fast_fetcher;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_fetch_succeeds_first_try() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/calls"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .expect(1)
        .mount(&server)
        .await;

    let body = fast_fetcher(3)
        .fetch(&format!("{}/calls", server.uri()))
        .await
        .unwrap();

    assert_eq!(body, "hello");
}

#[tokio::test]
async fn test_fetch_recovers_after_transient_failures() {
    let server = MockServer::start().await;

    // First two attempts fail, the third succeeds
    Mock::given(method("GET"))
        .and(path("/calls"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/calls"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let body = fast_fetcher(3)
        .fetch(&format!("{}/calls", server.uri()))
        .await
        .unwrap();

    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_fetch_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/calls"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let url = format!("{}/calls", server.uri());
    let err = fast_fetcher(2).fetch(&url).await.unwrap_err();

    assert_eq!(err.attempts, 3);
    assert_eq!(err.url, url);
    assert!(err.cause.contains("500"), "cause was: {}", err.cause);
}

#[tokio::test]
async fn test_fetch_without_retries_tries_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = fast_fetcher(0)
        .fetch(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(err.attempts, 1);
}
