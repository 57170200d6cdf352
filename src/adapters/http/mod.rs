//! HTTP adapters - REST and SSE endpoints.

pub mod chat;
pub mod middleware;

use std::time::Duration;

use axum::{middleware::from_fn_with_state, Router};

pub use chat::ChatHandlers;
pub use middleware::{auth_middleware, AuthState};

/// All `/api/chat` routes behind the bearer token middleware.
pub fn api_router(handlers: ChatHandlers, auth: AuthState, request_timeout: Duration) -> Router {
    let chat = chat::stream_routes(handlers.clone())
        .merge(chat::session_routes(handlers, request_timeout));

    Router::new()
        .nest("/api/chat", chat)
        .layer(from_fn_with_state(auth, auth_middleware))
}
