//! Generation backend port.
//!
//! The backend receives the new user message plus prior turns and answers
//! with a line-oriented stream. This port hides the transport; the relay
//! engine only pulls raw lines and classifies them itself.

use crate::domain::chat::{ChatError, ChatMessage, Role};
use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// One prior turn sent as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

impl From<&ChatMessage> for HistoryTurn {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role(),
            content: message.content().to_string(),
        }
    }
}

/// Body of a generation request.
///
/// `history` never includes `message` itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub message: String,
    pub history: Vec<HistoryTurn>,
}

impl GenerationRequest {
    pub fn new(message: impl Into<String>, history: Vec<HistoryTurn>) -> Self {
        Self {
            message: message.into(),
            history,
        }
    }
}

/// Failures reported by a generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// Backend answered with a non-success HTTP status.
    #[error("upstream returned status {status}")]
    Status { status: u16 },

    /// No bytes arrived within the configured read timeout.
    #[error("upstream timed out")]
    Timeout,

    /// Connection could not be established or broke mid-stream.
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// The caller cancelled before a response arrived.
    #[error("upstream request cancelled")]
    Cancelled,
}

impl UpstreamError {
    pub fn transport(message: impl Into<String>) -> Self {
        UpstreamError::Transport(message.into())
    }
}

impl From<UpstreamError> for ChatError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Timeout => ChatError::UpstreamTimeout,
            UpstreamError::Cancelled => ChatError::ClientDisconnected,
            other => ChatError::upstream_unavailable(other.to_string()),
        }
    }
}

/// Pull-based sequence of raw lines, newline and trailing `\r` removed.
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, UpstreamError>> + Send>>;

/// Port for the remote generation backend.
///
/// # Contract
///
/// - Each call opens a fresh connection; streams are never restarted.
/// - A non-success status is not an `open` failure: the returned stream
///   yields exactly one `UpstreamError::Status` item and ends.
/// - Once `cancel` fires, or the stream is dropped, the connection is torn
///   down and no further lines are read.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Issue a generation request.
    ///
    /// # Errors
    ///
    /// - `Transport` if the connection cannot be established
    /// - `Timeout` if the connect or response deadline passes
    /// - `Cancelled` if `cancel` fires before the response head arrives
    async fn open(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<LineStream, UpstreamError>;
}
