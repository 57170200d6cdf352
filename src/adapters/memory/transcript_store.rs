//! In-memory TranscriptStore.
//!
//! Messages live in one insertion-ordered vector, so a stable sort on
//! `created_at` keeps insertion order for equal timestamps.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::chat::{ChatMessage, ChatSession, Role};
use crate::domain::foundation::{DomainError, ErrorCode, SessionId, Timestamp, UserId};
use crate::ports::TranscriptStore;

/// In-memory storage for sessions and messages.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTranscriptStore {
    sessions: Arc<RwLock<HashMap<SessionId, ChatSession>>>,
    messages: Arc<RwLock<Vec<ChatMessage>>>,
    failing_role: Arc<RwLock<Option<Role>>>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `insert_message` for `role` fail with a
    /// database error. Used to exercise persistence failure paths.
    pub async fn fail_inserts_for(&self, role: Role) {
        *self.failing_role.write().await = Some(role);
    }

    /// Total number of stored messages across all sessions.
    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }

    /// Returns a session even if it has been soft-deleted.
    pub async fn raw_session(&self, id: &SessionId) -> Option<ChatSession> {
        self.sessions.read().await.get(id).cloned()
    }

    async fn with_live_session<T>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut ChatSession) -> T,
    ) -> Result<T, DomainError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(session) if !session.is_deleted() => Ok(f(session)),
            _ => Err(DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Session not found: {}", id),
            )),
        }
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn create_session(&self, session: &ChatSession) -> Result<(), DomainError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session.id()) {
            return Err(DomainError::database(format!(
                "Duplicate session id: {}",
                session.id()
            )));
        }
        sessions.insert(*session.id(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<ChatSession>, DomainError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id).filter(|s| !s.is_deleted()).cloned())
    }

    async fn update_session_title(&self, id: &SessionId, title: &str) -> Result<(), DomainError> {
        self.with_live_session(id, |session| session.rename(title))
            .await?
            .map_err(DomainError::from)
    }

    async fn touch_session(&self, id: &SessionId, at: Timestamp) -> Result<(), DomainError> {
        self.with_live_session(id, |session| session.touch(at)).await
    }

    async fn insert_message(&self, message: &ChatMessage) -> Result<(), DomainError> {
        if *self.failing_role.read().await == Some(message.role()) {
            return Err(DomainError::database(format!(
                "Simulated failure inserting {} message",
                message.role()
            )));
        }
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn list_messages(&self, session_id: &SessionId) -> Result<Vec<ChatMessage>, DomainError> {
        let messages = self.messages.read().await;
        let mut result: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.session_id() == session_id)
            .cloned()
            .collect();
        result.sort_by_key(|m| *m.created_at());
        Ok(result)
    }

    async fn delete_most_recent_messages(
        &self,
        session_id: &SessionId,
        count: u32,
    ) -> Result<u64, DomainError> {
        let mut messages = self.messages.write().await;

        let mut positions: Vec<usize> = messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.session_id() == session_id)
            .map(|(i, _)| i)
            .collect();
        positions.sort_by_key(|&i| (*messages[i].created_at(), i));

        let doomed: Vec<usize> = positions.into_iter().rev().take(count as usize).collect();
        let removed = doomed.len() as u64;

        let mut index = 0;
        messages.retain(|_| {
            let keep = !doomed.contains(&index);
            index += 1;
            keep
        });

        Ok(removed)
    }

    async fn list_sessions(&self, owner: &UserId) -> Result<Vec<ChatSession>, DomainError> {
        let sessions = self.sessions.read().await;
        let mut result: Vec<ChatSession> = sessions
            .values()
            .filter(|s| s.is_visible_to(owner))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.last_activity_at().cmp(a.last_activity_at()));
        Ok(result)
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), DomainError> {
        self.with_live_session(id, |session| session.mark_deleted())
            .await?;
        self.messages.write().await.retain(|m| m.session_id() != id);
        Ok(())
    }
}
