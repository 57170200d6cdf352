//! HTTP handlers for chat endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::{
    CreateSessionCommand, DeleteSessionCommand, RelayEngine, RenameSessionCommand,
    SendMessageCommand, SessionManager, TruncateHistoryCommand, TruncateHistoryHandler,
};
use crate::domain::chat::ChatError;
use crate::domain::foundation::SessionId;

use super::dto::{
    CreateSessionRequest, ErrorResponse, MessageResponse, RenameSessionRequest, RollbackRequest,
    RollbackResponse, SendMessageRequest, SessionResponse,
};
use super::sse::turn_event_stream;

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct ChatHandlers {
    engine: Arc<RelayEngine>,
    sessions: Arc<SessionManager>,
    truncate: Arc<TruncateHistoryHandler>,
}

impl ChatHandlers {
    pub fn new(
        engine: Arc<RelayEngine>,
        sessions: Arc<SessionManager>,
        truncate: Arc<TruncateHistoryHandler>,
    ) -> Self {
        Self {
            engine,
            sessions,
            truncate,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/chat/send - Send a message and stream the reply as SSE
pub async fn send_message(
    State(handlers): State<ChatHandlers>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<SendMessageRequest>,
) -> Response {
    let session_id = match req.session_id.as_deref().map(parse_session_id).transpose() {
        Ok(id) => id,
        Err(response) => return response,
    };

    let cmd = SendMessageCommand {
        owner: user.id,
        session_id,
        content: req.content,
    };

    match handlers.engine.stream_turn(cmd).await {
        Ok(handle) => turn_event_stream(handle).into_response(),
        Err(e) => handle_chat_error(e),
    }
}

/// POST /api/chat/sessions - Open an empty session
pub async fn create_session(
    State(handlers): State<ChatHandlers>,
    RequireAuth(user): RequireAuth,
    body: Option<Json<CreateSessionRequest>>,
) -> Response {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let cmd = CreateSessionCommand {
        owner: user.id,
        title: req.title,
    };

    match handlers.sessions.create(cmd).await {
        Ok(session) => (StatusCode::CREATED, Json(SessionResponse::from(&session))).into_response(),
        Err(e) => handle_chat_error(e),
    }
}

/// GET /api/chat/sessions - List the caller's sessions
pub async fn list_sessions(
    State(handlers): State<ChatHandlers>,
    RequireAuth(user): RequireAuth,
) -> Response {
    match handlers.sessions.list(&user.id).await {
        Ok(sessions) => {
            let body: Vec<SessionResponse> = sessions.iter().map(SessionResponse::from).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => handle_chat_error(e),
    }
}

/// GET /api/chat/sessions/:id/messages - Full history of one session
pub async fn list_messages(
    State(handlers): State<ChatHandlers>,
    RequireAuth(user): RequireAuth,
    Path(session_id): Path<String>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers.sessions.history(&user.id, &session_id).await {
        Ok(messages) => {
            let body: Vec<MessageResponse> = messages.iter().map(MessageResponse::from).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => handle_chat_error(e),
    }
}

/// PUT /api/chat/sessions/:id - Rename a session
pub async fn rename_session(
    State(handlers): State<ChatHandlers>,
    RequireAuth(user): RequireAuth,
    Path(session_id): Path<String>,
    Json(req): Json<RenameSessionRequest>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let cmd = RenameSessionCommand {
        session_id,
        owner: user.id,
        title: req.title,
    };

    match handlers.sessions.rename(cmd).await {
        Ok(session) => (StatusCode::OK, Json(SessionResponse::from(&session))).into_response(),
        Err(e) => handle_chat_error(e),
    }
}

/// DELETE /api/chat/sessions/:id - Delete a session and its messages
pub async fn delete_session(
    State(handlers): State<ChatHandlers>,
    RequireAuth(user): RequireAuth,
    Path(session_id): Path<String>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let cmd = DeleteSessionCommand {
        session_id,
        owner: user.id,
    };

    match handlers.sessions.delete(cmd).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => handle_chat_error(e),
    }
}

/// POST /api/chat/sessions/:id/rollback - Drop the newest `count` messages
pub async fn rollback_session(
    State(handlers): State<ChatHandlers>,
    RequireAuth(user): RequireAuth,
    Path(session_id): Path<String>,
    Json(req): Json<RollbackRequest>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let cmd = TruncateHistoryCommand {
        session_id,
        owner: user.id,
        count: req.count,
    };

    match handlers.truncate.handle(cmd).await {
        Ok(removed) => (StatusCode::OK, Json(RollbackResponse { removed })).into_response(),
        Err(e) => handle_chat_error(e),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════════════

fn parse_session_id(raw: &str) -> Result<SessionId, Response> {
    raw.parse::<SessionId>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("Invalid session ID")),
        )
            .into_response()
    })
}

fn handle_chat_error(error: ChatError) -> Response {
    let status = match &error {
        ChatError::NotFoundOrForbidden(_) => StatusCode::NOT_FOUND,
        ChatError::Validation { .. } => StatusCode::BAD_REQUEST,
        ChatError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        ChatError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        ChatError::ClientDisconnected | ChatError::PersistenceFailure(_) => {
            tracing::error!(error = %error, "Chat request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, Json(ErrorResponse::from(&error))).into_response()
}
