//! TruncateHistoryHandler - removes the newest messages of a session.
//!
//! Used to roll a conversation back before regenerating an answer.

use std::sync::Arc;

use crate::domain::chat::ChatError;
use crate::domain::foundation::{SessionId, UserId};
use crate::ports::TranscriptStore;

use super::session_coordinator::SessionCoordinator;

/// Command to delete the `count` most recent messages.
#[derive(Debug, Clone)]
pub struct TruncateHistoryCommand {
    pub session_id: SessionId,
    pub owner: UserId,
    /// Non-positive counts are a no-op.
    pub count: i64,
}

pub struct TruncateHistoryHandler {
    coordinator: SessionCoordinator,
    store: Arc<dyn TranscriptStore>,
}

impl TruncateHistoryHandler {
    pub fn new(store: Arc<dyn TranscriptStore>) -> Self {
        Self {
            coordinator: SessionCoordinator::new(store.clone()),
            store,
        }
    }

    /// Returns the number of messages removed.
    pub async fn handle(&self, cmd: TruncateHistoryCommand) -> Result<u64, ChatError> {
        if cmd.count <= 0 {
            return Ok(0);
        }

        self.coordinator.authorize(&cmd.owner, &cmd.session_id).await?;

        let count = u32::try_from(cmd.count).unwrap_or(u32::MAX);
        let removed = self
            .store
            .delete_most_recent_messages(&cmd.session_id, count)
            .await?;

        tracing::info!(
            session_id = %cmd.session_id,
            requested = cmd.count,
            removed,
            "Truncated session history"
        );
        Ok(removed)
    }
}
