//! Session management handlers: create, list, history, rename, delete.
//!
//! Every handler except listing goes through the coordinator's ownership
//! check first, so foreign and missing sessions look the same.

use std::sync::Arc;

use crate::domain::chat::{ChatError, ChatMessage, ChatSession};
use crate::domain::foundation::{SessionId, UserId};
use crate::ports::TranscriptStore;

use super::session_coordinator::SessionCoordinator;

/// Command to open a session without sending a message.
#[derive(Debug, Clone)]
pub struct CreateSessionCommand {
    pub owner: UserId,
    pub title: Option<String>,
}

/// Command to rename a session.
#[derive(Debug, Clone)]
pub struct RenameSessionCommand {
    pub session_id: SessionId,
    pub owner: UserId,
    pub title: String,
}

/// Command to delete a session and its messages.
#[derive(Debug, Clone)]
pub struct DeleteSessionCommand {
    pub session_id: SessionId,
    pub owner: UserId,
}

/// Handlers for session CRUD.
#[derive(Clone)]
pub struct SessionManager {
    coordinator: SessionCoordinator,
    store: Arc<dyn TranscriptStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn TranscriptStore>) -> Self {
        Self {
            coordinator: SessionCoordinator::new(store.clone()),
            store,
        }
    }

    pub async fn create(&self, cmd: CreateSessionCommand) -> Result<ChatSession, ChatError> {
        let session = self.coordinator.create_session(&cmd.owner, cmd.title).await?;
        tracing::info!(session_id = %session.id(), owner = %cmd.owner, "Created chat session");
        Ok(session)
    }

    /// The owner's live sessions, most recently active first.
    pub async fn list(&self, owner: &UserId) -> Result<Vec<ChatSession>, ChatError> {
        Ok(self.store.list_sessions(owner).await?)
    }

    /// Full message history of one session, oldest first.
    pub async fn history(
        &self,
        owner: &UserId,
        session_id: &SessionId,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        self.coordinator.authorize(owner, session_id).await?;
        self.coordinator.load_context(session_id).await
    }

    pub async fn rename(&self, cmd: RenameSessionCommand) -> Result<ChatSession, ChatError> {
        let mut session = self.coordinator.authorize(&cmd.owner, &cmd.session_id).await?;
        session.rename(cmd.title)?;
        self.store
            .update_session_title(&cmd.session_id, session.title())
            .await?;
        Ok(session)
    }

    pub async fn delete(&self, cmd: DeleteSessionCommand) -> Result<(), ChatError> {
        self.coordinator.authorize(&cmd.owner, &cmd.session_id).await?;
        self.store.delete_session(&cmd.session_id).await?;
        tracing::info!(session_id = %cmd.session_id, "Deleted chat session");
        Ok(())
    }
}
