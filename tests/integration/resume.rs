//! Crash-and-resume behavior tests

use std::time::Duration;

use lead_collector::cache::SqliteUserCache;
use lead_collector::client::{ApiClient, HttpConfig, RateLimiter};
use lead_collector::output::LeadLog;
use lead_collector::pipeline::{Pipeline, PipelineSettings};
use lead_collector::sink::DisabledSink;
use lead_collector::state::CursorStore;
use lead_collector::LeadRecord;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> ApiClient {
    ApiClient::new(
        server.uri(),
        (
            HeaderName::from_static("freelancer-oauth-v1"),
            HeaderValue::from_static("test-token"),
        ),
        RateLimiter::unthrottled(),
        HttpConfig {
            timeout: Duration::from_secs(5),
            max_retries: 0,
            backoff_base: Duration::from_millis(10),
            backoff_max: Duration::from_millis(20),
        },
    )
    .unwrap()
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        directory_limit: 2,
        reviews_limit: 100,
        users_batch_size: 50,
        query: String::new(),
    }
}

async fn mount_directory(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/users/0.1/users/directory/"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"users": [{"id": 10}, {"id": 11}]}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/0.1/users/directory/"))
        .and(query_param("offset", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": {"users": []}})),
        )
        .mount(server)
        .await;
}

fn empty_reviews() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"result": {"reviews": []}}))
}

#[tokio::test]
async fn test_resume_skips_already_processed_entities() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");
    let leads_path = dir.path().join("leads.jsonl");
    let cache_path = dir.path().join("cache.db");

    // First run: user 10 succeeds, then the reviews fetch for user 11 fails
    // hard, ending the run mid-page.
    mount_directory(&server).await;
    Mock::given(method("GET"))
        .and(path("/projects/0.1/reviews/"))
        .and(query_param("to_users[]", "10"))
        .respond_with(empty_reviews())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/0.1/reviews/"))
        .and(query_param("to_users[]", "11"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut pipeline = Pipeline::new(
        test_client(&server),
        SqliteUserCache::open(&cache_path).unwrap(),
        CursorStore::new(&state_path),
        LeadLog::new(&leads_path),
        Box::new(DisabledSink::new()),
        settings(),
    );
    pipeline.run().await.unwrap_err();

    // The cursor points past user 10 but not past user 11.
    let cursor = CursorStore::new(&state_path).load(2);
    assert_eq!(cursor.offset, 0);
    assert_eq!(cursor.index_in_page, 1);

    // Second run: the reviews endpoint for user 10 now fails, proving the
    // resumed run never touches it; user 11 succeeds.
    server.reset().await;
    mount_directory(&server).await;
    Mock::given(method("GET"))
        .and(path("/projects/0.1/reviews/"))
        .and(query_param("to_users[]", "10"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/0.1/reviews/"))
        .and(query_param("to_users[]", "11"))
        .respond_with(empty_reviews())
        .expect(1)
        .mount(&server)
        .await;

    let mut pipeline = Pipeline::new(
        test_client(&server),
        SqliteUserCache::open(&cache_path).unwrap(),
        CursorStore::new(&state_path),
        LeadLog::new(&leads_path),
        Box::new(DisabledSink::new()),
        settings(),
    );
    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.leads, 1);

    // Exactly one record per user across both runs, in order.
    let log = std::fs::read_to_string(&leads_path).unwrap();
    let user_ids: Vec<i64> = log
        .lines()
        .map(|line| serde_json::from_str::<LeadRecord>(line).unwrap().user_id)
        .collect();
    assert_eq!(user_ids, vec![10, 11]);

    let cursor = CursorStore::new(&state_path).load(2);
    assert_eq!(cursor.offset, 2);
    assert_eq!(cursor.index_in_page, 0);
}

#[tokio::test]
async fn test_completed_run_restarts_at_final_cursor() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");
    let leads_path = dir.path().join("leads.jsonl");

    mount_directory(&server).await;
    Mock::given(method("GET"))
        .and(path("/projects/0.1/reviews/"))
        .respond_with(empty_reviews())
        .mount(&server)
        .await;

    let mut pipeline = Pipeline::new(
        test_client(&server),
        SqliteUserCache::open(dir.path().join("cache.db")).unwrap(),
        CursorStore::new(&state_path),
        LeadLog::new(&leads_path),
        Box::new(DisabledSink::new()),
        settings(),
    );
    pipeline.run().await.unwrap();

    // Re-running after completion fetches only the (still empty) final page
    // and adds nothing.
    let mut pipeline = Pipeline::new(
        test_client(&server),
        SqliteUserCache::open(dir.path().join("cache.db")).unwrap(),
        CursorStore::new(&state_path),
        LeadLog::new(&leads_path),
        Box::new(DisabledSink::new()),
        settings(),
    );
    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.pages, 0);
    assert_eq!(summary.leads, 0);

    let log = std::fs::read_to_string(&leads_path).unwrap();
    assert_eq!(log.lines().count(), 2);
}
