//! Integration tests for the HTTP surface
//!
//! Requests are sent straight to the router with `tower::ServiceExt::oneshot`,
//! backed by a running relay and wiremock-served pages.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use sumi_relay::config::Config;
use sumi_relay::http::{create_router, AppState};
use sumi_relay::Relay;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_config(dir: &Path, max_active: usize) -> Config {
    let mut config = Config::default();
    config.pipeline.max_active = max_active;
    config.pipeline.poll_interval_ms = 20;
    config.pipeline.extraction_workers = 1;
    config.storage.image_dir = dir.join("images");
    config
}

fn create_test_app(relay: &Relay) -> Router {
    create_router(AppState {
        pipeline: relay.pipeline().clone(),
        broadcaster: relay.broadcaster().clone(),
    })
}

async fn start_slow_server() -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<title>slow</title>")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;
    mock_server
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let relay = Relay::start(&create_test_config(dir.path(), 5)).unwrap();

    let response = create_test_app(&relay)
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");

    relay.shutdown().await;
}

#[tokio::test]
async fn test_create_and_list_tasks() {
    let mock_server = start_slow_server().await;
    let dir = tempfile::tempdir().unwrap();
    let relay = Relay::start(&create_test_config(dir.path(), 5)).unwrap();
    let app = create_test_app(&relay);

    let url = format!("{}/slow", mock_server.uri());
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/tasks",
            json!({"urls": [{"url": url}, {"url": url}], "date": "2020-01-01T00:00:00"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let created = read_json(response).await;
    let created = created.as_array().unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0]["state"], "fetching");
    assert_eq!(created[0]["url"], url);
    assert_eq!(created[0]["scheduled_at"], "2020-01-01T00:00:00Z");
    assert_ne!(created[0]["id"], created[1]["id"]);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/tasks"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = read_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);
    assert_eq!(listed[0]["id"], created[0]["id"]);

    let id = created[1]["id"].as_str().unwrap();
    let response = app
        .oneshot(empty_request("GET", &format!("/api/tasks/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["id"], id);

    relay.shutdown().await;
}

#[tokio::test]
async fn test_create_over_capacity_returns_429() {
    let mock_server = start_slow_server().await;
    let dir = tempfile::tempdir().unwrap();
    let relay = Relay::start(&create_test_config(dir.path(), 1)).unwrap();
    let app = create_test_app(&relay);

    let body = json!({
        "urls": [{"url": format!("{}/slow", mock_server.uri())}],
        "date": "2020-01-01 00:00"
    });

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/tasks", body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request("POST", "/api/tasks", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        read_json(response).await,
        json!({"error_message": "Too many URLs are being processed at once"})
    );
    assert_eq!(relay.pipeline().registry().len(), 1);

    relay.shutdown().await;
}

#[tokio::test]
async fn test_create_with_bad_input_returns_400() {
    let dir = tempfile::tempdir().unwrap();
    let relay = Relay::start(&create_test_config(dir.path(), 5)).unwrap();
    let app = create_test_app(&relay);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/tasks",
            json!({"urls": [{"url": "http://example.com/"}], "date": "next tuesday"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(read_json(response).await["error_message"].is_string());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/tasks",
            json!({"urls": [{"url": "not a url"}], "date": "2020-01-01T00:00"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(relay.pipeline().registry().is_empty());
    relay.shutdown().await;
}

#[tokio::test]
async fn test_get_unknown_task() {
    let dir = tempfile::tempdir().unwrap();
    let relay = Relay::start(&create_test_config(dir.path(), 5)).unwrap();
    let app = create_test_app(&relay);

    let response = app
        .clone()
        .oneshot(empty_request(
            "GET",
            "/api/tasks/6a2f41a3-c54c-4fe2-8c2b-1d3f7a0d9e11",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(empty_request("GET", "/api/tasks/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    relay.shutdown().await;
}

#[tokio::test]
async fn test_cancel_task() {
    let mock_server = start_slow_server().await;
    let dir = tempfile::tempdir().unwrap();
    let relay = Relay::start(&create_test_config(dir.path(), 5)).unwrap();
    let app = create_test_app(&relay);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/tasks",
            json!({"urls": [{"url": format!("{}/slow", mock_server.uri())}], "date": "2020-01-01T00:00"}),
        ))
        .await
        .unwrap();
    let id = read_json(response).await[0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(empty_request("POST", &format!("/api/tasks/{}/cancel", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(read_json(response).await, json!({"accepted": true}));

    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/api/tasks/{}", id)))
        .await
        .unwrap();
    assert_eq!(read_json(response).await["state"], "cancelled");

    // A second cancel is still acknowledged
    let response = app
        .clone()
        .oneshot(empty_request("POST", &format!("/api/tasks/{}/cancel", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app
        .oneshot(empty_request(
            "POST",
            "/api/tasks/6a2f41a3-c54c-4fe2-8c2b-1d3f7a0d9e11/cancel",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    relay.shutdown().await;
}

#[tokio::test]
async fn test_events_stream_registers_observer() {
    let dir = tempfile::tempdir().unwrap();
    let relay = Relay::start(&create_test_config(dir.path(), 5)).unwrap();

    let response = create_test_app(&relay)
        .oneshot(empty_request("GET", "/api/events"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(relay.broadcaster().observer_count(), 1);

    relay.shutdown().await;
}

#[tokio::test]
async fn test_serves_saved_images() {
    let dir = tempfile::tempdir().unwrap();
    let relay = Relay::start(&create_test_config(dir.path(), 5)).unwrap();
    std::fs::write(relay.image_dir().join("abc-i.png"), b"png-bytes").unwrap();

    let app = create_test_app(&relay);
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/images/abc-i.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"png-bytes");

    let response = app
        .oneshot(empty_request("GET", "/images/missing.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    relay.shutdown().await;
}
