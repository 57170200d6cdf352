//! HTTP DTOs for chat endpoints.
//!
//! Field names are camelCase on the wire to match the `sessionId` control
//! event the stream opens with.

use serde::{Deserialize, Serialize};

use crate::domain::chat::{ChatError, ChatMessage, ChatSession};

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/chat/send`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Existing session; omitted to start a new one.
    #[serde(default)]
    pub session_id: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameSessionRequest {
    pub title: String,
}

/// Body of `POST /api/chat/sessions/:id/rollback`.
#[derive(Debug, Clone, Deserialize)]
pub struct RollbackRequest {
    pub count: i64,
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub last_activity_at: String,
}

impl From<&ChatSession> for SessionResponse {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.id().to_string(),
            title: session.title().to_string(),
            created_at: session.created_at().as_datetime().to_rfc3339(),
            last_activity_at: session.last_activity_at().as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_count: Option<i32>,
    pub created_at: String,
}

impl From<&ChatMessage> for MessageResponse {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id().to_string(),
            role: message.role().to_string(),
            content: message.content().to_string(),
            citations: message.citations().cloned(),
            token_count: message.token_count(),
            created_at: message.created_at().as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RollbackResponse {
    pub removed: u64,
}

/// Standard error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
        }
    }
}

impl From<&ChatError> for ErrorResponse {
    fn from(error: &ChatError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}
