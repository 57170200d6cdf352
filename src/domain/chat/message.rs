//! Message entity.
//!
//! Messages are immutable once written. The only way one disappears is
//! history truncation or the cascade from a deleted session.

use crate::domain::foundation::{MessageId, SessionId, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(ValidationError::invalid_format(
                "role",
                format!("unknown role '{}'", other),
            )),
        }
    }
}

/// Checks user-supplied message content.
///
/// # Errors
///
/// - `EmptyField` if the content is blank
/// - `TooLong` if it exceeds `max_chars` characters
pub fn validate_content(content: &str, max_chars: usize) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::empty_field("content"));
    }
    let len = content.chars().count();
    if len > max_chars {
        return Err(ValidationError::too_long("content", max_chars, len));
    }
    Ok(())
}

/// Turns literal `\n` escape sequences from the backend into real newlines.
pub fn unescape_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}

/// A persisted message within a session.
///
/// # Invariants
///
/// - `id` is globally unique
/// - `created_at` is set at construction and never changes
/// - user messages are never empty; assistant messages may be, when a turn
///   ended before any token arrived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    id: MessageId,
    session_id: SessionId,
    role: Role,
    content: String,
    citations: Option<serde_json::Value>,
    token_count: Option<i32>,
    created_at: Timestamp,
}

impl ChatMessage {
    /// Creates the user message that opens a turn.
    ///
    /// Content must already have passed `validate_content`.
    pub fn user(session_id: SessionId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            session_id,
            role: Role::User,
            content: content.into(),
            citations: None,
            token_count: None,
            created_at: Timestamp::now(),
        }
    }

    /// Creates the assistant message that closes a turn.
    pub fn assistant(
        session_id: SessionId,
        content: impl Into<String>,
        citations: Option<serde_json::Value>,
        token_count: Option<i32>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            session_id,
            role: Role::Assistant,
            content: content.into(),
            citations,
            token_count,
            created_at: Timestamp::now(),
        }
    }

    /// Reconstitutes a message from persistence (no validation).
    pub fn reconstitute(
        id: MessageId,
        session_id: SessionId,
        role: Role,
        content: String,
        citations: Option<serde_json::Value>,
        token_count: Option<i32>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            session_id,
            role,
            content,
            citations,
            token_count,
            created_at,
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Citation payload attached to an assistant message, if any.
    pub fn citations(&self) -> Option<&serde_json::Value> {
        self.citations.as_ref()
    }

    pub fn token_count(&self) -> Option<i32> {
        self.token_count
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::User, Role::Assistant] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("system".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }

    #[test]
    fn validate_content_rejects_blank() {
        assert_eq!(
            validate_content(" \n ", 100),
            Err(ValidationError::empty_field("content"))
        );
    }

    #[test]
    fn validate_content_counts_characters() {
        assert!(validate_content("ééé", 3).is_ok());
        assert_eq!(
            validate_content("éééé", 3),
            Err(ValidationError::too_long("content", 3, 4))
        );
    }

    #[test]
    fn unescape_newlines_replaces_literal_sequences() {
        assert_eq!(unescape_newlines("line one\\nline two"), "line one\nline two");
        assert_eq!(unescape_newlines("no escapes"), "no escapes");
    }

    #[test]
    fn user_message_has_no_metadata() {
        let msg = ChatMessage::user(SessionId::new(), "hi");
        assert_eq!(msg.role(), Role::User);
        assert!(msg.citations().is_none());
        assert!(msg.token_count().is_none());
    }

    #[test]
    fn assistant_message_may_be_empty_and_carry_citations() {
        let citations = json!([{"title": "doc", "url": "https://example.com"}]);
        let msg = ChatMessage::assistant(SessionId::new(), "", Some(citations.clone()), Some(0));
        assert_eq!(msg.role(), Role::Assistant);
        assert_eq!(msg.content(), "");
        assert_eq!(msg.citations(), Some(&citations));
        assert_eq!(msg.token_count(), Some(0));
    }
}
