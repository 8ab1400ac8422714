//! Retry behavior tests against a mock HTTP server

use std::time::Duration;

use lead_collector::client::{ApiClient, ApiError, HttpConfig, Payload, RateLimiter};
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer, max_retries: u32) -> ApiClient {
    ApiClient::new(
        server.uri(),
        (
            HeaderName::from_static("freelancer-oauth-v1"),
            HeaderValue::from_static("test-token"),
        ),
        RateLimiter::unthrottled(),
        HttpConfig {
            timeout: Duration::from_secs(5),
            max_retries,
            backoff_base: Duration::from_millis(10),
            backoff_max: Duration::from_millis(50),
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_persistent_transient_failure_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/0.1/users/directory/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(4) // max_retries=3 means 4 attempts total
        .mount(&server)
        .await;

    let mut client = test_client(&server, 3);
    let result = client.get("/users/0.1/users/directory/", &[]).await;

    match result {
        Err(ApiError::RetriesExhausted {
            attempts,
            last_status,
            body_snippet,
        }) => {
            assert_eq!(attempts, 4);
            assert_eq!(last_status, Some(503));
            assert_eq!(body_snippet.as_deref(), Some("unavailable"));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_recovers_after_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = test_client(&server, 3);
    let payload = client.get("/ok", &[]).await.unwrap();
    assert_eq!(payload, Payload::Json(json!({"result": {}})));
}

#[tokio::test]
async fn test_retry_after_header_delays_the_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/later"))
        .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "0.2"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/later"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {}})))
        .expect(1)
        .mount(&server)
        .await;

    // Backoff alone would wait 10ms; the header demands 200ms.
    let mut client = test_client(&server, 1);
    let started = std::time::Instant::now();
    client.get("/later", &[]).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_huge_retry_after_is_capped_at_backoff_max() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forever"))
        .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "1e300"))
        .expect(2)
        .mount(&server)
        .await;

    // backoff_max is 50ms, so the parseable-but-absurd header must wait
    // exactly that long instead of overflowing.
    let mut client = test_client(&server, 1);
    let started = std::time::Instant::now();
    match client.get("/forever", &[]).await {
        Err(ApiError::RetriesExhausted { last_status, .. }) => {
            assert_eq!(last_status, Some(503));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_secs(5));
}

#[tokio::test]
async fn test_hard_http_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = test_client(&server, 3);
    match client.get("/missing", &[]).await {
        Err(ApiError::Http { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "not found");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_success_is_a_degraded_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = test_client(&server, 3);
    let payload = client.get("/html", &[]).await.unwrap();
    match payload {
        Payload::NonJson { raw } => assert_eq!(raw, "<html>ok</html>"),
        other => panic!("expected NonJson, got {other:?}"),
    }
}

#[tokio::test]
async fn test_network_error_after_retries() {
    // Nothing listens here; connection is refused immediately.
    let mut client = ApiClient::new(
        "http://127.0.0.1:1",
        (
            HeaderName::from_static("freelancer-oauth-v1"),
            HeaderValue::from_static("test-token"),
        ),
        RateLimiter::unthrottled(),
        HttpConfig {
            timeout: Duration::from_secs(1),
            max_retries: 1,
            backoff_base: Duration::from_millis(10),
            backoff_max: Duration::from_millis(20),
        },
    )
    .unwrap();

    match client.get("/anything", &[]).await {
        Err(ApiError::Network(_)) => {}
        other => panic!("expected Network error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_auth_header_and_params_attached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/0.1/users/directory/"))
        .and(header("freelancer-oauth-v1", "test-token"))
        .and(query_param("limit", "20"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {"users": []}})))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = test_client(&server, 0);
    let params = [
        ("limit".to_string(), "20".to_string()),
        ("offset".to_string(), "0".to_string()),
    ];
    let payload = client
        .get("/users/0.1/users/directory/", &params)
        .await
        .unwrap();
    assert!(payload.as_json().is_some());
}
