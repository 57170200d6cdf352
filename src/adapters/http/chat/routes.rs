//! HTTP routes for chat endpoints.
//!
//! The streaming route is kept apart from the session routes so the request
//! timeout layer never cuts off a long generation.

use std::time::Duration;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::timeout::TimeoutLayer;

use super::handlers::{
    create_session, delete_session, list_messages, list_sessions, rename_session,
    rollback_session, send_message, ChatHandlers,
};

/// `POST /send`, bounded only by the upstream timeouts.
pub fn stream_routes(handlers: ChatHandlers) -> Router {
    Router::new()
        .route("/send", post(send_message))
        .with_state(handlers)
}

/// Session CRUD, each request bounded by `request_timeout`.
pub fn session_routes(handlers: ChatHandlers, request_timeout: Duration) -> Router {
    Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/:id", put(rename_session).delete(delete_session))
        .route("/sessions/:id/messages", get(list_messages))
        .route("/sessions/:id/rollback", post(rollback_session))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(handlers)
}
