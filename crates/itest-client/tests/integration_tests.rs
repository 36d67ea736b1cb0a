//! Integration tests for itest-client
//!
//! These run the transport, resource wrappers and lifecycle tracker against
//! a local mock HTTP server.

use std::collections::HashMap;
use std::time::Duration;

use itest_client::testing::unused_local_addr;
use itest_client::{
    Endpoint, FormPart, LifecycleTracker, Method, Request, ResourceClient, StatusCode, Transport,
    TransportErrorKind, DEFAULT_CONNECT_TIMEOUT,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Test Helpers
// =============================================================================

fn transport() -> Transport {
    Transport::with_config(
        Duration::from_secs(5),
        DEFAULT_CONNECT_TIMEOUT,
        HashMap::new(),
    )
    .expect("transport")
}

fn rules_client(server: &MockServer) -> ResourceClient {
    let endpoint =
        Endpoint::parse(&format!("{}/v1", server.uri()), "/rules").expect("endpoint");
    ResourceClient::new(transport(), endpoint)
}

// =============================================================================
// Transport Tests
// =============================================================================

#[tokio::test]
async fn test_non_success_status_is_a_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/rules/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let response = rules_client(&server)
        .get("missing", None)
        .await
        .expect("404 is not a transport error");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body, "not here");
    assert_eq!(response.method, Method::GET);
}

#[tokio::test]
async fn test_custom_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/status"))
        .and(header("X-Foo", "Bar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Status": "OK"})))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/v1/status", server.uri()).parse().unwrap();
    let response = transport()
        .send(Request::get(url).header("X-Foo", "Bar"))
        .await
        .unwrap();

    assert!(response.is_ok());
}

#[tokio::test]
async fn test_default_headers_apply_to_every_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer t0ken"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let mut headers = HashMap::new();
    headers.insert("Authorization".to_string(), "Bearer t0ken".to_string());
    let transport =
        Transport::with_config(Duration::from_secs(5), DEFAULT_CONNECT_TIMEOUT, headers).unwrap();

    let url: url::Url = format!("{}/v1/rules", server.uri()).parse().unwrap();
    for _ in 0..2 {
        let response = transport.send(Request::get(url.clone())).await.unwrap();
        assert!(response.is_ok());
    }
}

#[tokio::test]
async fn test_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/rules"))
        .and(body_json(json!({"Name": "pressure"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Id": "r1"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = rules_client(&server)
        .post(json!({"Name": "pressure"}))
        .await
        .unwrap();
    assert_eq!(response.body, r#"{"Id":"r1"}"#);
}

#[tokio::test]
async fn test_text_body_defaults_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/rules/r1"))
        .and(header("content-type", "text/plain; charset=utf-8"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let response = rules_client(&server).put("r1", "raw text").await.unwrap();
    assert!(response.is_ok());
}

#[tokio::test]
async fn test_multipart_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/packages"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let endpoint = Endpoint::parse(&format!("{}/v1", server.uri()), "/packages").unwrap();
    let packages = ResourceClient::new(transport(), endpoint);
    let parts = vec![
        FormPart::text("type", "EdgeManifest"),
        FormPart::file("package", "default package", br#"{"id":"tempid"}"#.to_vec()),
    ];
    packages.post(parts).await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let content_type = received[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data"));

    let body = String::from_utf8_lossy(&received[0].body);
    assert!(body.contains(r#"name="type""#));
    assert!(body.contains("EdgeManifest"));
    assert!(body.contains(r#"filename="default package""#));
    assert!(body.contains(r#"{"id":"tempid"}"#));
}

#[tokio::test]
async fn test_timeout_is_distinguishable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let url = format!("{}/v1/messages", server.uri()).parse().unwrap();
    let err = transport()
        .send(Request::get(url).timeout(Duration::from_millis(100)))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), TransportErrorKind::Timeout);
    assert!(err.url().ends_with("/v1/messages"));
}

#[tokio::test]
async fn test_connection_refused_is_distinguishable() {
    let addr = unused_local_addr().await.unwrap();
    let endpoint = Endpoint::parse(&format!("http://{}/v1", addr), "/devices").unwrap();
    let devices = ResourceClient::new(transport(), endpoint);

    let err = devices.list().await.unwrap_err();
    assert_eq!(err.kind(), TransportErrorKind::Connect);
    assert_eq!(err.method(), &Method::GET);
}

// =============================================================================
// Lifecycle Tracker Tests
// =============================================================================

#[tokio::test]
async fn test_drain_issues_one_delete_per_resource() {
    let server = MockServer::start().await;
    for id in ["r1", "r2", "r3"] {
        Mock::given(method("DELETE"))
            .and(path(format!("/v1/rules/{}", id)))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }

    let rules = rules_client(&server);
    let mut tracker = LifecycleTracker::new();
    for id in ["r1", "r2", "r3"] {
        tracker.track(&rules, id);
    }

    let report = tracker.drain().await;
    assert_eq!(report.attempted(), 3);
    assert!(report.is_clean());
    assert!(tracker.is_empty());

    // Dependents first: reverse creation order
    let received = server.received_requests().await.unwrap();
    let order: Vec<&str> = received.iter().map(|r| r.url.path()).collect();
    assert_eq!(order, vec!["/v1/rules/r3", "/v1/rules/r2", "/v1/rules/r1"]);
}

#[tokio::test]
async fn test_drain_continues_after_failed_delete() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/rules/bad"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/rules/good"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/rules/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let rules = rules_client(&server);
    let mut tracker = LifecycleTracker::new();
    tracker.track(&rules, "good");
    tracker.track(&rules, "bad");
    tracker.track(&rules, "gone");

    let report = tracker.drain().await;
    assert_eq!(report.attempted(), 3);
    assert_eq!(report.deleted.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].resource.ends_with("/v1/rules/bad"));
    assert!(report.failures[0].reason.contains("500"));
}

#[tokio::test]
async fn test_drain_records_transport_failures() {
    let addr = unused_local_addr().await.unwrap();
    let endpoint = Endpoint::parse(&format!("http://{}/v1", addr), "/rules").unwrap();
    let rules = ResourceClient::new(transport(), endpoint);

    let mut tracker = LifecycleTracker::new();
    tracker.track(&rules, "a");
    tracker.track(&rules, "b");

    let report = tracker.drain().await;
    assert_eq!(report.attempted(), 2);
    assert_eq!(report.failures.len(), 2);
    assert!(tracker.is_empty());
}
