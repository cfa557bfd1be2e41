//! Retry/backoff semantics of the source clients against a mock upstream.

use std::time::{Duration, Instant};

use serde_json::json;
use walletsnap::adapters::{DebankClient, HyperliquidClient};
use walletsnap::config::{DebankConfig, HyperliquidConfig, RetryConfig};
use walletsnap::error::SnapError;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Millisecond-scale backoff so the full exponential ladder runs in-test
fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        backoff_base_ms: 10,
        backoff_cap_ms: 80,
        timeout_secs: 5,
    }
}

fn hyperliquid_config(server: &MockServer) -> HyperliquidConfig {
    HyperliquidConfig {
        api_url: server.uri(),
        ..Default::default()
    }
}

fn debank_config(server: &MockServer) -> DebankConfig {
    DebankConfig {
        base_url: server.uri(),
        api_key: "test-key".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn recovers_after_transient_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(4)
        .expect(4)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"marginSummary": {"equity": "42.0"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HyperliquidClient::new(&hyperliquid_config(&server), fast_retry(5)).unwrap();

    let started = Instant::now();
    let doc = client.fetch_clearinghouse_state("0xabc").await.unwrap();

    assert_eq!(doc["marginSummary"]["equity"], "42.0");
    // Four retries back off 10 + 20 + 40 + 80 ms
    assert!(
        started.elapsed() >= Duration::from_millis(150),
        "expected the full backoff ladder, elapsed {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn rate_limit_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"assetPositions": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HyperliquidClient::new(&hyperliquid_config(&server), fast_retry(5)).unwrap();
    let doc = client.fetch_clearinghouse_state("0xabc").await.unwrap();
    assert!(doc["assetPositions"].is_array());
}

#[tokio::test]
async fn client_error_fails_immediately_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/user/all_complex_protocol_list"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such wallet"))
        .expect(1)
        .mount(&server)
        .await;

    let client = DebankClient::new(&debank_config(&server), fast_retry(5)).unwrap();

    let started = Instant::now();
    let err = client.fetch_protocols("0xabc").await.unwrap_err();

    match err {
        SnapError::Fetch { status, body, .. } => {
            assert_eq!(status, 404);
            assert!(body.contains("no such wallet"));
        }
        other => panic!("expected Fetch, got {other:?}"),
    }
    // No backoff should have happened
    assert!(started.elapsed() < Duration::from_millis(100));
}

#[tokio::test]
async fn retries_exhaust_with_last_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(3)
        .mount(&server)
        .await;

    let client = HyperliquidClient::new(&hyperliquid_config(&server), fast_retry(3)).unwrap();
    let err = client.fetch_clearinghouse_state("0xabc").await.unwrap_err();

    match err {
        SnapError::FetchExhausted {
            attempts,
            status,
            body,
            ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected FetchExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn debank_request_carries_access_key_and_wallet() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/user/all_complex_protocol_list"))
        .and(query_param("id", "0xAbC"))
        .and(header("AccessKey", "test-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "aave", "chain": "eth"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = DebankClient::new(&debank_config(&server), fast_retry(5)).unwrap();
    let items = client.fetch_protocols("0xAbC").await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "aave");
}

#[tokio::test]
async fn debank_null_body_is_an_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let client = DebankClient::new(&debank_config(&server), fast_retry(5)).unwrap();
    assert!(client.fetch_protocols("0xabc").await.unwrap().is_empty());
}

#[tokio::test]
async fn hyperliquid_posts_clearinghouse_state_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(
            json!({"type": "clearinghouseState", "user": "0xabc"}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HyperliquidClient::new(&hyperliquid_config(&server), fast_retry(5)).unwrap();
    client.fetch_clearinghouse_state("0xabc").await.unwrap();
}

#[tokio::test]
async fn malformed_success_body_is_a_fetch_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let client = HyperliquidClient::new(&hyperliquid_config(&server), fast_retry(5)).unwrap();
    let err = client.fetch_clearinghouse_state("0xabc").await.unwrap_err();

    match err {
        SnapError::Fetch { status, body, .. } => {
            assert_eq!(status, 200);
            assert!(body.contains("JSON parse error"));
        }
        other => panic!("expected Fetch, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_debank_api_key_is_rejected_before_any_request() {
    let config = DebankConfig {
        api_key: String::new(),
        ..Default::default()
    };
    let err = DebankClient::new(&config, fast_retry(5)).unwrap_err();
    assert!(matches!(err, SnapError::InvalidConfig(_)));
}
