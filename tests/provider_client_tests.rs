//! Integration tests for the HTTP alert provider client against a mock
//! server: directory pagination and dedup, credential handling, error
//! mapping, and mention page parsing.

use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use alertsync::provider::{AlertProvider, HttpAlertProvider, MentionQuery, ProviderError};

fn provider(server: &MockServer, page_size: u32) -> HttpAlertProvider {
    HttpAlertProvider::new(
        Url::parse(&server.uri()).expect("mock server url"),
        Some("test-token".to_string()),
        page_size,
    )
}

#[tokio::test]
async fn test_list_alerts_paginates_and_dedups() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/alerts"))
        .and(query_param("offset", "0"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "alerts": [
                {"id": "a1", "name": "Brand Watch", "is_active": true},
                {"id": "a2", "name": "Competitor", "is_active": false},
            ],
            "has_more": true,
        })))
        .mount(&server)
        .await;

    // Second page repeats a2; the client must deduplicate.
    Mock::given(method("GET"))
        .and(path("/v1/alerts"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "alerts": [
                {"id": "a2", "name": "Competitor", "is_active": false},
                {"id": 3, "is_active": true},
            ],
            "has_more": false,
        })))
        .mount(&server)
        .await;

    let alerts = provider(&server, 2).list_alerts().await.expect("alerts");

    assert_eq!(alerts.len(), 3);
    assert_eq!(alerts[0].id, "a1");
    assert!(!alerts[1].is_active);
    // Numeric ids are normalized to strings, missing names get a fallback.
    assert_eq!(alerts[2].id, "3");
    assert_eq!(alerts[2].name, "alert-3");
}

#[tokio::test]
async fn test_missing_credential_short_circuits() {
    let server = MockServer::start().await;
    let provider = HttpAlertProvider::new(
        Url::parse(&server.uri()).expect("mock server url"),
        None,
        100,
    );

    let err = provider.list_alerts().await.expect_err("must fail");
    assert!(matches!(err, ProviderError::MissingCredential));
    assert!(!err.is_retryable());
    // No request reached the server.
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_http_error_carries_status_and_truncated_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/alerts"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let err = provider(&server, 100)
        .list_alerts()
        .await
        .expect_err("must fail");

    match err {
        ProviderError::Http { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "unauthorized");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_rate_limit_is_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/alerts"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = provider(&server, 100)
        .list_alerts()
        .await
        .expect_err("must fail");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_malformed_listing_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    let err = provider(&server, 100)
        .list_alerts()
        .await
        .expect_err("must fail");
    assert!(matches!(err, ProviderError::Malformed(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_fetch_mentions_parses_page_and_passes_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/alerts/a1/mentions"))
        .and(query_param("cursor", "c1"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "mentions": [
                {"id": "m1", "published_at": "2026-01-10T08:00:00Z"},
                {"id": "m2"},
            ],
            "next_cursor": "c2",
            "has_more": true,
        })))
        .mount(&server)
        .await;

    let page = provider(&server, 100)
        .fetch_mentions(&MentionQuery {
            remote_alert_id: "a1".to_string(),
            since: chrono::Utc::now() - chrono::Duration::days(30),
            cursor: Some("c1".to_string()),
            page_size: 50,
        })
        .await
        .expect("page");

    assert_eq!(page.mentions.len(), 2);
    assert!(page.mentions[0].published_at.is_some());
    assert!(page.mentions[1].published_at.is_none());
    assert_eq!(page.next_cursor.as_deref(), Some("c2"));
    assert!(page.has_more);
}

#[tokio::test]
async fn test_fetch_mentions_last_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/alerts/a1/mentions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "mentions": [],
        })))
        .mount(&server)
        .await;

    let page = provider(&server, 100)
        .fetch_mentions(&MentionQuery {
            remote_alert_id: "a1".to_string(),
            since: chrono::Utc::now(),
            cursor: None,
            page_size: 50,
        })
        .await
        .expect("page");

    assert!(page.mentions.is_empty());
    assert!(page.next_cursor.is_none());
    assert!(!page.has_more);
}
