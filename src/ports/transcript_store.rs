//! Transcript store port.
//!
//! Persistence contract for chat sessions and their messages. The store is
//! owner-agnostic: callers check ownership before mutating anything.
//!
//! Implementations must support concurrent single-row writes from many
//! in-flight turns. No multi-row transaction is required.

use crate::domain::chat::{ChatMessage, ChatSession};
use crate::domain::foundation::{DomainError, SessionId, Timestamp, UserId};
use async_trait::async_trait;

/// Repository port for sessions and messages.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Persist a newly opened session.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn create_session(&self, session: &ChatSession) -> Result<(), DomainError>;

    /// Find a session by id.
    ///
    /// Soft-deleted sessions are reported as `None`.
    async fn get_session(&self, id: &SessionId) -> Result<Option<ChatSession>, DomainError>;

    /// Overwrite a session's title.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update_session_title(&self, id: &SessionId, title: &str) -> Result<(), DomainError>;

    /// Record activity on a session.
    async fn touch_session(&self, id: &SessionId, at: Timestamp) -> Result<(), DomainError>;

    /// Append a message.
    async fn insert_message(&self, message: &ChatMessage) -> Result<(), DomainError>;

    /// All messages of a session, oldest first. Ties on creation time keep
    /// insertion order.
    async fn list_messages(&self, session_id: &SessionId) -> Result<Vec<ChatMessage>, DomainError>;

    /// Delete the `count` newest messages of a session.
    ///
    /// Returns how many rows were removed, which is fewer than `count` when
    /// the session holds fewer messages.
    async fn delete_most_recent_messages(
        &self,
        session_id: &SessionId,
        count: u32,
    ) -> Result<u64, DomainError>;

    /// Live sessions owned by `owner`, most recently active first.
    async fn list_sessions(&self, owner: &UserId) -> Result<Vec<ChatSession>, DomainError>;

    /// Soft-delete a session and remove its messages.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn delete_session(&self, id: &SessionId) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn TranscriptStore) {}
    }
}
