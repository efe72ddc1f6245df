//! DI "Interfaces"

use crate::error::{AuthError, BackendError, RecorderError, StudyError};
use crate::infrastructure::entities;
use crate::infrastructure::entities::MessageKind;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Placeholder stored as the content of an image turn sent without a caption.
pub const IMAGE_PLACEHOLDER: &str = "Image uploaded";

#[async_trait]
pub trait StudyService: Send + Sync {
    /// Lists the user's sessions, most recently active first.
    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<entities::Session>, StudyError>;

    /// Creates a new session for the given user.
    ///
    /// Returns `Err(StudyError::EmptyName)` for a blank name. A missing or blank instruction is
    /// replaced by the default instruction text.
    async fn create_session(
        &self,
        user_id: Uuid,
        name: &str,
        instruction: Option<&str>,
    ) -> Result<entities::Session, StudyError>;

    /// Fetches a single session owned by the user.
    async fn session_details(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<entities::Session, StudyError>;

    /// Moves the session's updated timestamp to now.
    async fn touch_session(&self, user_id: Uuid, session_id: Uuid) -> Result<(), StudyError>;

    /// List all messages in a session, oldest first.
    async fn list_messages(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<Vec<entities::Message>, StudyError>;

    /// Stores one complete turn.
    ///
    /// The helper functions `create_X_message` should be used instead for clarity.
    async fn create_raw_message(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        kind: MessageKind,
        content: String,
        ai_response: String,
    ) -> Result<entities::Message, StudyError>;

    async fn create_text_message(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        content: String,
        ai_response: String,
    ) -> Result<entities::Message, StudyError> {
        self.create_raw_message(user_id, session_id, MessageKind::Text, content, ai_response)
            .await
    }

    async fn create_voice_message(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        transcript: String,
        ai_response: String,
    ) -> Result<entities::Message, StudyError> {
        self.create_raw_message(
            user_id,
            session_id,
            MessageKind::Voice,
            transcript,
            ai_response,
        )
        .await
    }

    /// Stores an image turn; a blank caption is replaced by [`IMAGE_PLACEHOLDER`].
    async fn create_image_message(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        caption: String,
        ai_response: String,
    ) -> Result<entities::Message, StudyError> {
        let content = if caption.trim().is_empty() {
            IMAGE_PLACEHOLDER.to_owned()
        } else {
            caption
        };

        self.create_raw_message(user_id, session_id, MessageKind::Image, content, ai_response)
            .await
    }
}

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(AuthUser),
    TokenRefreshed(AuthUser),
    SignedOut,
}

impl AuthEvent {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            AuthEvent::SignedIn(user) | AuthEvent::TokenRefreshed(user) => Some(user),
            AuthEvent::SignedOut => None,
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Queries the current user, `None` when signed out.
    async fn current_user(&self) -> Result<Option<AuthUser>, AuthError>;

    /// Subscribes to auth-state change notifications.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Body of the AI chat endpoint request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Uuid,
    pub message_type: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    pub system_prompt: String,
}

#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Sends one turn to the AI and returns its reply text.
    async fn chat(&self, request: &ChatRequest) -> Result<String, BackendError>;

    /// Transcribes base64-encoded audio into text.
    async fn transcribe(&self, audio_base64: &str) -> Result<String, BackendError>;
}

#[async_trait]
pub trait AudioRecorder: Send + Sync {
    /// Acquires the microphone and starts buffering audio.
    async fn start(&self) -> Result<Box<dyn Recording>, RecorderError>;
}

#[async_trait]
pub trait Recording: Send {
    /// Finalizes the capture and returns the recorded bytes.
    async fn stop(&mut self) -> Result<Vec<u8>, RecorderError>;
}
