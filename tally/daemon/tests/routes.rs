//! Route tests
//!
//! Requests go straight through the router with `tower::ServiceExt::oneshot`;
//! no socket is opened.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use tally_core::stream::SseDecoder;
use tally_core::{
    NewUser, StoreError, StreamEvent, TallyConfigFile, User, UserPatch, UserStore,
};
use tally_daemon::DaemonServer;

// =============================================================================
// Helpers
// =============================================================================

fn app() -> Router {
    DaemonServer::new(TallyConfigFile::default()).router()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, form: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn create_user(app: &Router, name: &str, email: &str) -> Value {
    let form = format!("action=create&name={name}&email={email}");
    let (status, body) = send(app, post_form("/users", &form)).await;
    assert_eq!(status, StatusCode::OK, "create failed: {body}");
    body["user"].clone()
}

/// Store that fails every call
struct UnavailableStore;

#[async_trait]
impl UserStore for UnavailableStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn get(&self, _id: i64) -> Result<Option<User>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn create(&self, _user: NewUser) -> Result<User, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn update(&self, _id: i64, _patch: UserPatch) -> Result<Option<User>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn delete(&self, _id: i64) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

// =============================================================================
// Example API
// =============================================================================

#[tokio::test]
async fn test_example_get_counts_requests() {
    let app = app();

    let (status, first) = send(&app, get("/example-api/get")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        first,
        json!({ "message": "This is response for GET method API", "count": 1 })
    );

    let (_, second) = send(&app, get("/example-api/get")).await;
    assert_eq!(second["count"], 2);
}

#[tokio::test]
async fn test_example_counter_is_per_server() {
    let first = app();
    let second = app();

    send(&first, get("/example-api/get")).await;
    send(&first, get("/example-api/get")).await;
    let (_, body) = send(&second, get("/example-api/get")).await;

    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_example_post_echoes_body() {
    let app = app();

    let (status, body) = send(&app, post_json("/example-api/post", r#"{"key":"value"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": { "key": "value" } }));
}

#[tokio::test]
async fn test_example_post_rejects_malformed_json() {
    let app = app();

    let (status, body) = send(&app, post_json("/example-api/post", "{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Malformed payload"));
}

// =============================================================================
// Users
// =============================================================================

#[tokio::test]
async fn test_users_empty_list() {
    let app = app();

    let (status, body) = send(&app, get("/users")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "users": [] }));
}

#[tokio::test]
async fn test_create_and_list_ordered_by_name() {
    let app = app();

    let carol = create_user(&app, "Carol", "carol%40example.com").await;
    create_user(&app, "Ada", "ada%40example.com").await;

    assert_eq!(carol["id"], 1);
    assert_eq!(carol["name"], "Carol");
    assert_eq!(carol["email"], "carol@example.com");
    assert_eq!(carol["age"], 0);

    let (_, body) = send(&app, get("/users")).await;
    let names: Vec<&str> = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Ada", "Carol"]);
}

#[tokio::test]
async fn test_get_user() {
    let app = app();
    create_user(&app, "Ada", "ada%40example.com").await;

    let (status, body) = send(&app, get("/users/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Ada");

    let (status, body) = send(&app, get("/users/99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not Found" }));
}

#[tokio::test]
async fn test_update_user() {
    let app = app();
    create_user(&app, "Ada", "ada%40example.com").await;

    let (status, body) = send(
        &app,
        post_form("/users/1", "name=Ada+Lovelace&email=ada%40lovelace.org"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Ada Lovelace");
    assert_eq!(body["user"]["email"], "ada@lovelace.org");

    let (status, _) = send(&app, post_form("/users/7", "name=Nobody&email=n%40x.io")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_user() {
    let app = app();
    create_user(&app, "Ada", "ada%40example.com").await;

    let (status, body) = send(&app, post_form("/users", "action=delete&id=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, _) = send(&app, get("/users/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Deleting an id that no longer exists still succeeds
    let (status, body) = send(&app, post_form("/users", "action=delete&id=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
}

#[tokio::test]
async fn test_delete_requires_numeric_id() {
    let app = app();

    let (status, body) = send(&app, post_form("/users", "action=delete&id=abc")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Malformed payload: id must be an integer");
}

#[tokio::test]
async fn test_invalid_action() {
    let app = app();

    for form in ["action=rename&name=x", "name=x&email=y"] {
        let (status, body) = send(&app, post_form("/users", form)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "error": "Failed to perform action: Invalid action" })
        );
    }
}

#[tokio::test]
async fn test_create_validation_and_conflict() {
    let app = app();

    let (status, body) = send(&app, post_form("/users", "action=create&name=Ada&email=")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Failed to perform action: invalid email: must not be empty"
    );

    create_user(&app, "Ada", "ada%40example.com").await;
    let (status, body) = send(
        &app,
        post_form("/users", "action=create&name=Other&email=ada%40example.com"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "Failed to perform action: email ada@example.com is already in use"
    );
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let app = DaemonServer::with_store(TallyConfigFile::default(), Arc::new(UnavailableStore))
        .router();

    let (status, body) = send(&app, get("/users")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "error": "Failed to fetch users: storage unavailable: connection refused" })
    );

    let (status, body) = send(&app, post_form("/users", "action=create&name=A&email=a%40x.io")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to perform action:"));
}

// =============================================================================
// Stream and Health
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_stream_resource_sends_ticks_then_exit() {
    let mut config = TallyConfigFile::default();
    config.stream.tick_limit = 3;
    config.stream.tick_period = Duration::from_millis(100);
    let server = DaemonServer::new(config);
    let app = server.router();

    let response = app.oneshot(get("/stream-resource")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    // The body ends on its own after the exit event
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let mut decoder = SseDecoder::new();
    decoder.push(&bytes);
    let events: Vec<StreamEvent> = std::iter::from_fn(|| decoder.decode())
        .filter_map(|frame| frame.into_stream_event())
        .collect();

    assert_eq!(
        events,
        vec![
            StreamEvent::tick(1),
            StreamEvent::tick(2),
            StreamEvent::tick(3),
            StreamEvent::exit(),
        ]
    );

    let stats = server.state().producer.stats();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.active_sessions, 0);
}

#[tokio::test]
async fn test_health_reports_stream_stats() {
    let app = app();

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["stream"]["sessions_opened"], 0);
    assert_eq!(body["stream"]["active_sessions"], 0);
}
