//! DB Repository abstractions

use crate::error::StoreError;
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{Message, Session};
use crate::infrastructure::traits::StudyRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use di::{Ref, injectable};
use log::error;
use uuid::Uuid;

#[injectable(StudyRepository)]
pub struct DbStudyRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbStudyRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        DbStudyRepository { connection }
    }
}

fn log_store_error(e: sqlx::Error) -> StoreError {
    error!("{e}");
    StoreError::Database(e)
}

#[async_trait]
impl StudyRepository for DbStudyRepository {
    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<Session>, StoreError> {
        sqlx::query_as("SELECT * FROM sessions WHERE user_id = ? ORDER BY updated_at DESC, rowid DESC")
            .bind(user_id)
            .fetch_all(&**self.connection)
            .await
            .map_err(log_store_error)
    }

    async fn create_session(&self, session: Session) -> Result<Session, StoreError> {
        sqlx::query_as(
            "INSERT INTO sessions (id, user_id, name, system_prompt, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.name)
        .bind(session.system_prompt)
        .bind(session.created_at)
        .bind(session.updated_at)
        .fetch_one(&**self.connection)
        .await
        .map_err(log_store_error)
    }

    async fn find_session(&self, user_id: Uuid, session_id: Uuid) -> Result<Session, StoreError> {
        sqlx::query_as("SELECT * FROM sessions WHERE id = ? AND user_id = ?")
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(&**self.connection)
            .await
            .map_err(log_store_error)?
            .ok_or(StoreError::SessionNotFound(session_id))
    }

    async fn touch_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE sessions SET updated_at = ? WHERE id = ? AND user_id = ?")
            .bind(updated_at)
            .bind(session_id)
            .bind(user_id)
            .execute(&**self.connection)
            .await
            .map_err(log_store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::SessionNotFound(session_id));
        }
        Ok(())
    }

    async fn list_session_messages(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<Vec<Message>, StoreError> {
        sqlx::query_as(
            "SELECT chat_messages.* FROM chat_messages INNER JOIN sessions ON sessions.id = chat_messages.session_id WHERE chat_messages.session_id = ? AND sessions.user_id = ? ORDER BY chat_messages.created_at ASC, chat_messages.rowid ASC",
        )
            .bind(session_id)
            .bind(user_id)
            .fetch_all(&**self.connection)
            .await
            .map_err(log_store_error)
    }

    async fn create_message_in_session(&self, message: Message) -> Result<Message, StoreError> {
        let session_id = message.session_id;
        let user_id = message.user_id;

        sqlx::query_as(
            "INSERT INTO chat_messages (id, session_id, user_id, content, message_type, ai_response, image_url, created_at) SELECT ?, ?, ?, ?, ?, ?, ?, ? WHERE EXISTS (SELECT 1 FROM sessions WHERE id = ? AND user_id = ?) RETURNING *",
        )
            .bind(message.id)
            .bind(session_id)
            .bind(user_id)
            .bind(message.content)
            .bind(message.message_type)
            .bind(message.ai_response)
            .bind(message.image_url)
            .bind(message.created_at)
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(&**self.connection)
            .await
            .map_err(log_store_error)?
            .ok_or(StoreError::SessionNotFound(session_id))
    }
}
