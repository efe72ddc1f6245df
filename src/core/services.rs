//! Implementations for the service the app needs.
//!

use crate::core::traits::StudyService;
use crate::error::StudyError;
use crate::infrastructure::entities::{Message, MessageKind, Session};
use crate::infrastructure::traits::StudyRepository;
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::info;
use uuid::Uuid;

/// Instruction text used when a session is created without one.
pub const DEFAULT_INSTRUCTION: &str = "You are a patient study assistant. Explain concepts step by step, check the student's understanding with short questions, and keep answers focused on the subject of this session.";

#[injectable(StudyService)]
pub struct MyStudyService {
    repo: Ref<dyn StudyRepository>,
}

impl MyStudyService {
    pub fn new(repo: Ref<dyn StudyRepository>) -> Self {
        MyStudyService { repo }
    }
}

#[async_trait]
impl StudyService for MyStudyService {
    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<Session>, StudyError> {
        Ok(self.repo.list_sessions(user_id).await?)
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        name: &str,
        instruction: Option<&str>,
    ) -> Result<Session, StudyError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StudyError::EmptyName);
        }

        let system_prompt = instruction
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(DEFAULT_INSTRUCTION);

        let now = Utc::now();
        let session = self
            .repo
            .create_session(Session {
                id: Uuid::new_v4(),
                user_id,
                name: name.to_owned(),
                system_prompt: system_prompt.to_owned(),
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!("created session {} ({:?})", session.id, session.name);
        Ok(session)
    }

    async fn session_details(&self, user_id: Uuid, session_id: Uuid) -> Result<Session, StudyError> {
        Ok(self.repo.find_session(user_id, session_id).await?)
    }

    async fn touch_session(&self, user_id: Uuid, session_id: Uuid) -> Result<(), StudyError> {
        Ok(self
            .repo
            .touch_session(user_id, session_id, Utc::now())
            .await?)
    }

    async fn list_messages(&self, user_id: Uuid, session_id: Uuid) -> Result<Vec<Message>, StudyError> {
        Ok(self.repo.list_session_messages(user_id, session_id).await?)
    }

    async fn create_raw_message(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        kind: MessageKind,
        content: String,
        ai_response: String,
    ) -> Result<Message, StudyError> {
        Ok(self
            .repo
            .create_message_in_session(Message {
                id: Uuid::new_v4(),
                session_id,
                user_id,
                content,
                message_type: kind,
                ai_response,
                image_url: None,
                created_at: Utc::now(),
            })
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::IMAGE_PLACEHOLDER;
    use crate::error::StoreError;
    use crate::infrastructure::database::DatabaseConnection;
    use crate::infrastructure::repositories::DbStudyRepository;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

    async fn service() -> MyStudyService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let connection = DatabaseConnection::from_pool(pool);
        connection.migrate().await.unwrap();
        MyStudyService::new(Arc::new(DbStudyRepository::new(Arc::new(connection))))
    }

    #[tokio::test]
    async fn test_create_session_uses_default_instruction() {
        let service = service().await;
        let user = Uuid::new_v4();

        let blank = service.create_session(user, "Chemistry", Some("   ")).await.unwrap();
        let missing = service.create_session(user, "Physics", None).await.unwrap();
        let custom = service
            .create_session(user, "  History  ", Some("Quiz me on dates"))
            .await
            .unwrap();

        assert_eq!(blank.system_prompt, DEFAULT_INSTRUCTION);
        assert_eq!(missing.system_prompt, DEFAULT_INSTRUCTION);
        assert_eq!(custom.system_prompt, "Quiz me on dates");
        assert_eq!(custom.name, "History");
        assert_eq!(custom.user_id, user);
    }

    #[tokio::test]
    async fn test_create_session_rejects_blank_name() {
        let service = service().await;

        let result = service.create_session(Uuid::new_v4(), " \t ", None).await;
        assert!(matches!(result, Err(StudyError::EmptyName)));
    }

    #[tokio::test]
    async fn test_image_message_without_caption_uses_placeholder() {
        let service = service().await;
        let user = Uuid::new_v4();
        let session = service.create_session(user, "Biology", None).await.unwrap();

        let message = service
            .create_image_message(user, session.id, String::new(), "A plant cell".to_owned())
            .await
            .unwrap();

        assert_eq!(message.content, IMAGE_PLACEHOLDER);
        assert_eq!(message.message_type, MessageKind::Image);
        assert!(message.image_url.is_none());
    }

    #[tokio::test]
    async fn test_foreign_session_is_not_found() {
        let service = service().await;
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let session = service.create_session(owner, "Private", None).await.unwrap();

        let details = service.session_details(intruder, session.id).await;
        assert!(matches!(
            details,
            Err(StudyError::Store(StoreError::SessionNotFound(id))) if id == session.id
        ));

        let insert = service
            .create_text_message(intruder, session.id, "hi".to_owned(), "hello".to_owned())
            .await;
        assert!(insert.is_err());

        let touch = service.touch_session(intruder, session.id).await;
        assert!(touch.is_err());
    }
}
