//! Tests for the HTTP transport module

use super::*;
use crate::error::Error;
use crate::pagination::{Page, PageFetcher, PageRequest};
use crate::types::{BackoffType, Filters, Method};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    let config = ApiClientConfig::new(server.uri())
        .without_rate_limit()
        .with_max_retries(2)
        .with_backoff(
            BackoffType::Constant,
            Duration::from_millis(1),
            Duration::from_millis(5),
        );
    ApiClient::new(config).unwrap()
}

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    id: String,
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_api_client_config_defaults() {
    let config = ApiClientConfig::new("https://api.example.com");
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.backoff_type, BackoffType::Exponential);
    assert!(config.rate_limit.is_some());
    assert!(config.user_agent.starts_with("dashfeed/"));
}

#[test]
fn test_api_client_rejects_bad_url() {
    let err = ApiClient::new(ApiClientConfig::new("not a url")).unwrap_err();
    assert!(matches!(err, Error::InvalidUrl(_)));
}

#[test_case(BackoffType::Constant, 0, 100 ; "constant first")]
#[test_case(BackoffType::Constant, 3, 100 ; "constant later")]
#[test_case(BackoffType::Linear, 2, 300 ; "linear")]
#[test_case(BackoffType::Exponential, 3, 800 ; "exponential")]
#[test_case(BackoffType::Exponential, 10, 2000 ; "exponential capped")]
fn test_calculate_backoff(backoff: BackoffType, attempt: u32, expected_ms: u64) {
    let client = ApiClient::new(
        ApiClientConfig::new("https://api.example.com").with_backoff(
            backoff,
            Duration::from_millis(100),
            Duration::from_secs(2),
        ),
    )
    .unwrap();
    assert_eq!(
        client.calculate_backoff(attempt),
        Duration::from_millis(expected_ms)
    );
}

// ============================================================================
// Client Tests
// ============================================================================

#[tokio::test]
async fn test_get_json_with_query_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/events"))
        .and(query_param("limit", "10"))
        .and(header("X-Api-Key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "e1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(
        ApiClientConfig::new(server.uri())
            .without_rate_limit()
            .with_header("X-Api-Key", "secret"),
    )
    .unwrap();
    let item: Item = client
        .get_json("/api/v1/events", &[("limit".into(), "10".into())])
        .await
        .unwrap();

    assert_eq!(item, Item { id: "e1".into() });
}

#[tokio::test]
async fn test_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "ok"})))
        .mount(&server)
        .await;

    let item: Item = client_for(&server).get_json("/flaky", &[]).await.unwrap();
    assert_eq!(item.id, "ok");
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(3)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_json::<Item>("/down", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 502, .. }));
}

#[tokio::test]
async fn test_client_errors_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such list"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_json::<Item>("/missing", &[])
        .await
        .unwrap_err();
    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such list");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_rate_limited_honours_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "later"})))
        .mount(&server)
        .await;

    let item: Item = client_for(&server).get_json("/busy", &[]).await.unwrap();
    assert_eq!(item.id, "later");
}

#[tokio::test]
async fn test_conflict_mapped_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/alerts/a1"))
        .and(body_json(json!({"status": "resolved", "version": 3})))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "alert was modified",
            "current_version": 4,
            "expected_version": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .send_json::<_, Item>(
            Method::PATCH,
            "/alerts/a1",
            &json!({"status": "resolved", "version": 3}),
        )
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    match err {
        Error::Conflict {
            message,
            current_version,
            expected_version,
        } => {
            assert_eq!(message, "alert was modified");
            assert_eq!(current_version, Some(4));
            assert_eq!(expected_version, Some(3));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_conflict_with_plain_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/alerts/a1/acknowledge"))
        .respond_with(ResponseTemplate::new(409).set_body_string("stale version"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .send_json::<_, Item>(Method::POST, "/alerts/a1/acknowledge", &json!({}))
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Conflict { ref message, current_version: None, .. } if message == "stale version")
    );
}

#[tokio::test]
async fn test_send_json_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/alerts/a1/acknowledge"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let value: Option<Item> = client_for(&server)
        .send_json(Method::POST, "/alerts/a1/acknowledge", &json!({}))
        .await
        .unwrap();
    assert_eq!(value, None);
}

// ============================================================================
// Page Fetcher Tests
// ============================================================================

#[test]
fn test_query_params_first_page() {
    let filters = Filters::new()
        .with("severity", "high")
        .with("sources", json!(["gpu-0", "gpu-1"]));
    let params = HttpPageFetcher::<Item>::query_params(&PageRequest::first(25, filters));

    assert_eq!(
        params,
        vec![
            ("limit".to_string(), "25".to_string()),
            ("include_total".to_string(), "true".to_string()),
            ("severity".to_string(), "high".to_string()),
            ("sources".to_string(), "gpu-0,gpu-1".to_string()),
        ]
    );
}

#[test]
fn test_query_params_next_page() {
    let params =
        HttpPageFetcher::<Item>::query_params(&PageRequest::after("abc".into(), 25, Filters::new()));

    assert_eq!(
        params,
        vec![
            ("limit".to_string(), "25".to_string()),
            ("cursor".to_string(), "abc".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_http_page_fetcher() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/jobs"))
        .and(query_param("include_total", "true"))
        .and(query_param("status", "running"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "j1"}, {"id": "j2"}],
            "pagination": {"next_cursor": "c1", "total": 3}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/jobs"))
        .and(query_param("cursor", "c1"))
        .and(query_param_is_missing("include_total"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "j3"}],
            "pagination": {"next_cursor": null}
        })))
        .mount(&server)
        .await;

    let fetcher: HttpPageFetcher<Item> =
        HttpPageFetcher::new(Arc::new(client_for(&server)), "jobs", "/api/v1/jobs");
    let filters = Filters::new().with("status", "running");

    let first = fetcher
        .fetch_page(PageRequest::first(2, filters.clone()))
        .await
        .unwrap();
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.pagination.total, Some(3));
    assert!(first.has_more());

    let next: Page<Item> = fetcher
        .fetch_page(PageRequest::after("c1".into(), 2, filters))
        .await
        .unwrap();
    assert_eq!(next.items, vec![Item { id: "j3".into() }]);
    assert!(!next.has_more());
}

#[tokio::test]
async fn test_http_page_fetcher_malformed_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let fetcher: HttpPageFetcher<Item> =
        HttpPageFetcher::new(Arc::new(client_for(&server)), "jobs", "/api/v1/jobs");
    let err = fetcher
        .fetch_page(PageRequest::first(2, Filters::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Fetch { ref namespace, .. } if namespace == "jobs"));
}
