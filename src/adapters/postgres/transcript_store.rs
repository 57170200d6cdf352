//! PostgreSQL implementation of TranscriptStore.
//!
//! Sessions are soft-deleted through `deleted_at`; messages are ordered by
//! `created_at` with the `seq` column breaking ties in insertion order.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::chat::{ChatMessage, ChatSession, Role};
use crate::domain::foundation::{
    DomainError, ErrorCode, MessageId, SessionId, Timestamp, UserId,
};
use crate::ports::TranscriptStore;

/// PostgreSQL implementation of TranscriptStore.
#[derive(Clone)]
pub struct PostgresTranscriptStore {
    pool: PgPool,
}

impl PostgresTranscriptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TranscriptStore for PostgresTranscriptStore {
    async fn create_session(&self, session: &ChatSession) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO chat_sessions (
                id, owner_id, title, created_at, last_activity_at, deleted_at
            ) VALUES ($1, $2, $3, $4, $5, NULL)
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.owner().as_str())
        .bind(session.title())
        .bind(session.created_at().as_datetime())
        .bind(session.last_activity_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to insert session"))?;

        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<ChatSession>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, title, created_at, last_activity_at, deleted_at
            FROM chat_sessions
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch session"))?;

        row.map(row_to_session).transpose()
    }

    async fn update_session_title(&self, id: &SessionId, title: &str) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE chat_sessions SET title = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .bind(title)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to update session title"))?;

        if result.rows_affected() == 0 {
            return Err(session_not_found(id));
        }
        Ok(())
    }

    async fn touch_session(&self, id: &SessionId, at: Timestamp) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE chat_sessions
            SET last_activity_at = GREATEST(last_activity_at, $2)
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to touch session"))?;

        if result.rows_affected() == 0 {
            return Err(session_not_found(id));
        }
        Ok(())
    }

    async fn insert_message(&self, message: &ChatMessage) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO chat_messages (
                id, session_id, role, content, citations, token_count, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(message.id().as_uuid())
        .bind(message.session_id().as_uuid())
        .bind(message.role().as_str())
        .bind(message.content())
        .bind(message.citations().cloned())
        .bind(message.token_count())
        .bind(message.created_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to insert message"))?;

        Ok(())
    }

    async fn list_messages(&self, session_id: &SessionId) -> Result<Vec<ChatMessage>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, role, content, citations, token_count, created_at
            FROM chat_messages
            WHERE session_id = $1
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(session_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch messages"))?;

        rows.into_iter().map(row_to_message).collect()
    }

    async fn delete_most_recent_messages(
        &self,
        session_id: &SessionId,
        count: u32,
    ) -> Result<u64, DomainError> {
        if count == 0 {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            DELETE FROM chat_messages
            WHERE id IN (
                SELECT id FROM chat_messages
                WHERE session_id = $1
                ORDER BY created_at DESC, seq DESC
                LIMIT $2
            )
            "#,
        )
        .bind(session_id.as_uuid())
        .bind(i64::from(count))
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to truncate history"))?;

        Ok(result.rows_affected())
    }

    async fn list_sessions(&self, owner: &UserId) -> Result<Vec<ChatSession>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, title, created_at, last_activity_at, deleted_at
            FROM chat_sessions
            WHERE owner_id = $1 AND deleted_at IS NULL
            ORDER BY last_activity_at DESC
            "#,
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch sessions by owner"))?;

        rows.into_iter().map(row_to_session).collect()
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let result = sqlx::query(
            "UPDATE chat_sessions SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to delete session"))?;

        if result.rows_affected() == 0 {
            return Err(session_not_found(id));
        }

        sqlx::query("DELETE FROM chat_messages WHERE session_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete session messages"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit session delete"))?;

        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| DomainError::database(format!("{}: {}", context, e))
}

fn session_not_found(id: &SessionId) -> DomainError {
    DomainError::new(ErrorCode::SessionNotFound, format!("Session not found: {}", id))
}

fn str_to_role(s: &str) -> Result<Role, DomainError> {
    s.parse::<Role>()
        .map_err(|_| DomainError::database(format!("Invalid message role: {}", s)))
}

fn row_to_session(row: sqlx::postgres::PgRow) -> Result<ChatSession, DomainError> {
    let id: uuid::Uuid = row.try_get("id").map_err(db_error("Failed to get id"))?;
    let owner_id: String = row
        .try_get("owner_id")
        .map_err(db_error("Failed to get owner_id"))?;
    let title: String = row.try_get("title").map_err(db_error("Failed to get title"))?;
    let created_at: chrono::DateTime<chrono::Utc> = row
        .try_get("created_at")
        .map_err(db_error("Failed to get created_at"))?;
    let last_activity_at: chrono::DateTime<chrono::Utc> = row
        .try_get("last_activity_at")
        .map_err(db_error("Failed to get last_activity_at"))?;
    let deleted_at: Option<chrono::DateTime<chrono::Utc>> = row
        .try_get("deleted_at")
        .map_err(db_error("Failed to get deleted_at"))?;

    let owner = UserId::new(owner_id)
        .map_err(|e| DomainError::database(format!("Invalid owner_id: {}", e)))?;

    Ok(ChatSession::reconstitute(
        SessionId::from_uuid(id),
        owner,
        title,
        Timestamp::from_datetime(created_at),
        Timestamp::from_datetime(last_activity_at),
        deleted_at.is_some(),
    ))
}

fn row_to_message(row: sqlx::postgres::PgRow) -> Result<ChatMessage, DomainError> {
    let id: uuid::Uuid = row.try_get("id").map_err(db_error("Failed to get id"))?;
    let session_id: uuid::Uuid = row
        .try_get("session_id")
        .map_err(db_error("Failed to get session_id"))?;
    let role: String = row.try_get("role").map_err(db_error("Failed to get role"))?;
    let content: String = row
        .try_get("content")
        .map_err(db_error("Failed to get content"))?;
    let citations: Option<serde_json::Value> = row
        .try_get("citations")
        .map_err(db_error("Failed to get citations"))?;
    let token_count: Option<i32> = row
        .try_get("token_count")
        .map_err(db_error("Failed to get token_count"))?;
    let created_at: chrono::DateTime<chrono::Utc> = row
        .try_get("created_at")
        .map_err(db_error("Failed to get created_at"))?;

    Ok(ChatMessage::reconstitute(
        MessageId::from_uuid(id),
        SessionId::from_uuid(session_id),
        str_to_role(&role)?,
        content,
        citations,
        token_count,
        Timestamp::from_datetime(created_at),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_to_role_accepts_stored_values() {
        assert_eq!(str_to_role("user").unwrap(), Role::User);
        assert_eq!(str_to_role("assistant").unwrap(), Role::Assistant);
    }

    #[test]
    fn str_to_role_rejects_invalid() {
        let err = str_to_role("system").unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn db_error_prefixes_context() {
        let err = db_error("Failed to fetch session")(sqlx::Error::RowNotFound);
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.starts_with("Failed to fetch session: "));
    }

    #[test]
    fn session_not_found_uses_not_found_code() {
        let id = SessionId::new();
        let err = session_not_found(&id);
        assert_eq!(err.code, ErrorCode::SessionNotFound);
        assert!(err.message.contains(&id.to_string()));
    }
}
