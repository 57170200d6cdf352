//! Integration tests for the chat HTTP endpoints.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`, backed
//! by the in-memory store, a mock token validator and a canned backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use futures::stream;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use chat_relay::adapters::auth::MockSessionValidator;
use chat_relay::adapters::http::{api_router, ChatHandlers};
use chat_relay::adapters::memory::InMemoryTranscriptStore;
use chat_relay::application::handlers::{RelayEngine, RelayOptions, SessionManager, TruncateHistoryHandler};
use chat_relay::ports::{GenerationBackend, GenerationRequest, LineStream, UpstreamError};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct CannedBackend {
    lines: Vec<&'static str>,
}

#[async_trait]
impl GenerationBackend for CannedBackend {
    async fn open(
        &self,
        _request: GenerationRequest,
        _cancel: CancellationToken,
    ) -> Result<LineStream, UpstreamError> {
        let lines: Vec<_> = self.lines.iter().map(|l| Ok(l.to_string())).collect();
        Ok(Box::pin(stream::iter(lines)))
    }
}

fn app() -> Router {
    app_replying(vec!["data: Hi", "data: !", "data: [DONE]"])
}

fn app_replying(lines: Vec<&'static str>) -> Router {
    let store = Arc::new(InMemoryTranscriptStore::new());
    let handlers = ChatHandlers::new(
        Arc::new(RelayEngine::new(
            store.clone(),
            Arc::new(CannedBackend { lines }),
            RelayOptions::default(),
        )),
        Arc::new(SessionManager::new(store.clone())),
        Arc::new(TruncateHistoryHandler::new(store)),
    );
    let validator = MockSessionValidator::new()
        .with_test_user("alice-token", "alice")
        .with_test_user("mallory-token", "mallory");

    api_router(handlers, Arc::new(validator), Duration::from_secs(5))
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn create_session(app: &Router) -> String {
    let (status, body) = call(
        app,
        request(Method::POST, "/api/chat/sessions", Some("alice-token"), Some(json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let body: Value = serde_json::from_str(&body).unwrap();
    body["id"].as_str().unwrap().to_string()
}

fn sse_data(body: &str) -> Vec<&str> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .collect()
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let app = app();
    let (status, _) = call(&app, request(Method::GET, "/api/chat/sessions", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn requests_with_unknown_token_are_unauthorized() {
    let app = app();
    let (status, _) = call(
        &app,
        request(Method::GET, "/api/chat/sessions", Some("forged"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Streaming
// =============================================================================

#[tokio::test]
async fn send_streams_session_tokens_and_done() {
    let app = app();
    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/chat/send",
            Some("alice-token"),
            Some(json!({ "content": "hello" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    let data = sse_data(&body);

    assert_eq!(data.len(), 4);
    let control: Value = serde_json::from_str(data[0]).unwrap();
    assert!(control["sessionId"].is_string());
    assert_eq!(&data[1..], &["Hi", "!", "[DONE]"]);
}

#[tokio::test]
async fn carriage_return_in_reply_is_framed_as_separate_data_lines() {
    let app = app_replying(vec!["data: a\rb", "data: [DONE]"]);
    let (status, body) = call(
        &app,
        request(
            Method::POST,
            "/api/chat/send",
            Some("alice-token"),
            Some(json!({ "content": "hello" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = sse_data(&body);
    assert_eq!(&data[1..], &["a", "b", "[DONE]"]);
}

#[tokio::test]
async fn send_with_blank_content_is_bad_request() {
    let app = app();
    let (status, body) = call(
        &app,
        request(
            Method::POST,
            "/api/chat/send",
            Some("alice-token"),
            Some(json!({ "content": "  " })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn send_to_foreign_session_is_not_found() {
    let app = app();
    let session_id = create_session(&app).await;

    let (status, _) = call(
        &app,
        request(
            Method::POST,
            "/api/chat/send",
            Some("mallory-token"),
            Some(json!({ "sessionId": session_id, "content": "hi" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Session management
// =============================================================================

#[tokio::test]
async fn session_lifecycle() {
    let app = app();
    let session_id = create_session(&app).await;
    let base = format!("/api/chat/sessions/{}", session_id);

    let (status, body) = call(
        &app,
        request(Method::PUT, &base, Some("alice-token"), Some(json!({ "title": "Budget" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["title"], "Budget");

    call(
        &app,
        request(
            Method::POST,
            "/api/chat/send",
            Some("alice-token"),
            Some(json!({ "sessionId": session_id, "content": "first" })),
        ),
    )
    .await;

    let (status, body) = call(
        &app,
        request(Method::GET, &format!("{}/messages", base), Some("alice-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let messages: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1]["content"], "Hi!");
    assert_eq!(messages[1]["tokenCount"], 2);

    let (status, body) = call(
        &app,
        request(
            Method::POST,
            &format!("{}/rollback", base),
            Some("alice-token"),
            Some(json!({ "count": 1 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["removed"], 1);

    let (status, body) = call(
        &app,
        request(Method::GET, "/api/chat/sessions", Some("alice-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let sessions: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["title"], "Budget");

    let (status, _) = call(&app, request(Method::DELETE, &base, Some("alice-token"), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(
        &app,
        request(Method::GET, &format!("{}/messages", base), Some("alice-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn foreign_history_is_not_found() {
    let app = app();
    let session_id = create_session(&app).await;

    let (status, _) = call(
        &app,
        request(
            Method::GET,
            &format!("/api/chat/sessions/{}/messages", session_id),
            Some("mallory-token"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_session_id_is_bad_request() {
    let app = app();
    let (status, _) = call(
        &app,
        request(
            Method::DELETE,
            "/api/chat/sessions/not-a-uuid",
            Some("alice-token"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
