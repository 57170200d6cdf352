//! Session coordinator.
//!
//! Resolves which session a turn belongs to, enforces ownership, applies
//! the first-message title rule and loads prior turns as context.

use std::sync::Arc;

use crate::domain::chat::{ChatError, ChatMessage, ChatSession, DEFAULT_TITLE};
use crate::domain::foundation::{SessionId, Timestamp, UserId};
use crate::ports::TranscriptStore;

/// Session lookup and bookkeeping shared by every chat handler.
#[derive(Clone)]
pub struct SessionCoordinator {
    store: Arc<dyn TranscriptStore>,
}

impl SessionCoordinator {
    pub fn new(store: Arc<dyn TranscriptStore>) -> Self {
        Self { store }
    }

    /// Loads a live session owned by `owner`.
    ///
    /// # Errors
    ///
    /// - `NotFoundOrForbidden` if the session is missing, deleted or owned
    ///   by someone else
    /// - `PersistenceFailure` if the store cannot be read
    pub async fn authorize(
        &self,
        owner: &UserId,
        session_id: &SessionId,
    ) -> Result<ChatSession, ChatError> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or_else(|| ChatError::not_found(*session_id))?;

        if !session.is_visible_to(owner) {
            tracing::debug!(
                session_id = %session_id,
                owner = %owner,
                "Session access denied"
            );
            return Err(ChatError::not_found(*session_id));
        }
        Ok(session)
    }

    /// Returns the session for this turn, creating one when none was given.
    ///
    /// A new session is written with its title already derived from
    /// `first_message`. An existing session still carrying the placeholder
    /// title has it replaced once; later turns leave the title alone.
    pub async fn resolve_or_create(
        &self,
        owner: &UserId,
        session_id: Option<SessionId>,
        first_message: &str,
    ) -> Result<ChatSession, ChatError> {
        let Some(session_id) = session_id else {
            let session = ChatSession::for_first_message(owner.clone(), first_message)?;
            self.store.create_session(&session).await?;
            tracing::info!(
                session_id = %session.id(),
                owner = %owner,
                "Created chat session"
            );
            return Ok(session);
        };

        let mut session = self.authorize(owner, &session_id).await?;
        if let Some(title) = session.title_from_first_message(first_message) {
            self.store.update_session_title(&session_id, title).await?;
        }
        Ok(session)
    }

    /// Opens an empty session, optionally with a caller-chosen title.
    pub async fn create_session(
        &self,
        owner: &UserId,
        title: Option<String>,
    ) -> Result<ChatSession, ChatError> {
        let title = title.unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let session = ChatSession::new(owner.clone(), title)?;
        self.store.create_session(&session).await?;
        Ok(session)
    }

    /// Messages of a session, oldest first.
    pub async fn load_context(&self, session_id: &SessionId) -> Result<Vec<ChatMessage>, ChatError> {
        Ok(self.store.list_messages(session_id).await?)
    }

    /// Marks the session as active now.
    pub async fn touch(&self, session_id: &SessionId) -> Result<(), ChatError> {
        Ok(self.store.touch_session(session_id, Timestamp::now()).await?)
    }
}
