//! Infrastructure traits, used for DI on higher levels

use crate::error::StoreError;
use crate::infrastructure::entities;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Access to the session and message tables.
///
/// Every operation is scoped to `user_id`; rows owned by other users are invisible.
#[async_trait]
pub trait StudyRepository: Send + Sync {
    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<entities::Session>, StoreError>;

    async fn create_session(
        &self,
        session: entities::Session,
    ) -> Result<entities::Session, StoreError>;

    async fn find_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<entities::Session, StoreError>;

    async fn touch_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn list_session_messages(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<Vec<entities::Message>, StoreError>;

    /// Inserts a message. Fails with `SessionNotFound` unless `message.user_id` owns the session.
    async fn create_message_in_session(
        &self,
        message: entities::Message,
    ) -> Result<entities::Message, StoreError>;
}
