//! Chat error taxonomy.

use crate::domain::foundation::{DomainError, ErrorCode, SessionId, ValidationError};
use thiserror::Error;

/// Errors surfaced by chat operations.
///
/// Errors raised before a turn's stream exists are returned to the caller.
/// Errors raised while streaming become the turn's terminal event instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Session missing, deleted, or owned by someone else. The three cases
    /// are indistinguishable to the caller.
    #[error("Session not found: {0}")]
    NotFoundOrForbidden(SessionId),

    #[error("Validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    /// Backend unreachable or answered with a non-success status.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream timed out")]
    UpstreamTimeout,

    #[error("Client disconnected")]
    ClientDisconnected,

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl ChatError {
    pub fn not_found(id: SessionId) -> Self {
        ChatError::NotFoundOrForbidden(id)
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ChatError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        ChatError::UpstreamUnavailable(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        ChatError::PersistenceFailure(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ChatError::NotFoundOrForbidden(_) => ErrorCode::SessionNotFound,
            ChatError::Validation { .. } => ErrorCode::ValidationFailed,
            ChatError::UpstreamUnavailable(_) => ErrorCode::UpstreamUnavailable,
            ChatError::UpstreamTimeout => ErrorCode::UpstreamTimeout,
            ChatError::ClientDisconnected => ErrorCode::InternalError,
            ChatError::PersistenceFailure(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<ValidationError> for ChatError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyField { ref field }
            | ValidationError::TooLong { ref field, .. }
            | ValidationError::InvalidFormat { ref field, .. } => {
                ChatError::validation(field.clone(), err.to_string())
            }
        }
    }
}

impl From<DomainError> for ChatError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => ChatError::validation(
                err.details.get("field").cloned().unwrap_or_else(|| "unknown".to_string()),
                err.message,
            ),
            _ => ChatError::PersistenceFailure(err.to_string()),
        }
    }
}
