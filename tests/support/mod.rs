//! Shared fixtures: in-memory store and in-process stand-ins for the remote services.

#![allow(dead_code)]

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use study_assistant::core::conversation::ConversationDeps;
use study_assistant::core::notifications::{Notifier, Toast};
use study_assistant::core::services::MyStudyService;
use study_assistant::core::traits::{
    AssistantBackend, AudioRecorder, AuthEvent, AuthProvider, AuthUser, ChatRequest, Recording,
    StudyService,
};
use study_assistant::error::{AuthError, BackendError, RecorderError};
use study_assistant::infrastructure::database::DatabaseConnection;
use study_assistant::infrastructure::repositories::DbStudyRepository;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

/// Migrated in-memory database. One connection keeps every query on the same database.
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();
    pool
}

pub fn study_service(pool: &SqlitePool) -> Arc<dyn StudyService> {
    let connection = Arc::new(DatabaseConnection::from_pool(pool.clone()));
    Arc::new(MyStudyService::new(Arc::new(DbStudyRepository::new(
        connection,
    ))))
}

pub fn student() -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        email: Some("student@example.com".to_owned()),
    }
}

pub struct StaticAuth {
    pub user: Mutex<Option<AuthUser>>,
    pub events: broadcast::Sender<AuthEvent>,
}

impl StaticAuth {
    pub fn signed_in(user: AuthUser) -> Arc<StaticAuth> {
        Arc::new(StaticAuth {
            user: Mutex::new(Some(user)),
            events: broadcast::channel(8).0,
        })
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    async fn current_user(&self) -> Result<Option<AuthUser>, AuthError> {
        Ok(self.user.lock().unwrap().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.user.lock().unwrap().take();
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }
}

/// Scripted AI backend that records every request it receives.
pub struct FakeBackend {
    pub requests: Mutex<Vec<ChatRequest>>,
    pub transcriptions: Mutex<Vec<String>>,
    reply: Mutex<Option<String>>,
    transcript: Mutex<Option<String>>,
    delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeBackend {
    pub fn replying(reply: &str) -> Arc<FakeBackend> {
        FakeBackend::build(Some(reply), Duration::ZERO)
    }

    pub fn failing() -> Arc<FakeBackend> {
        FakeBackend::build(None, Duration::ZERO)
    }

    pub fn slow(reply: &str, delay: Duration) -> Arc<FakeBackend> {
        FakeBackend::build(Some(reply), delay)
    }

    fn build(reply: Option<&str>, delay: Duration) -> Arc<FakeBackend> {
        Arc::new(FakeBackend {
            requests: Mutex::new(Vec::new()),
            transcriptions: Mutex::new(Vec::new()),
            reply: Mutex::new(reply.map(str::to_owned)),
            transcript: Mutex::new(None),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn set_transcript(&self, transcript: Option<&str>) {
        *self.transcript.lock().unwrap() = transcript.map(str::to_owned);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl AssistantBackend for FakeBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<String, BackendError> {
        self.requests.lock().unwrap().push(request.clone());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let reply = self.reply.lock().unwrap().clone();
        reply.ok_or_else(|| BackendError::Remote {
            endpoint: "study-chat".to_owned(),
            status: 500,
            message: "model unavailable".to_owned(),
        })
    }

    async fn transcribe(&self, audio_base64: &str) -> Result<String, BackendError> {
        self.transcriptions
            .lock()
            .unwrap()
            .push(audio_base64.to_owned());

        let transcript = self.transcript.lock().unwrap().clone();
        transcript.ok_or_else(|| BackendError::MalformedResponse {
            endpoint: "transcribe-audio".to_owned(),
            reason: "missing field `text`".to_owned(),
        })
    }
}

/// Microphone stand-in: either denies access or yields fixed audio bytes.
pub struct StubRecorder {
    pub deny: bool,
    pub audio: Vec<u8>,
}

struct StubRecording {
    audio: Vec<u8>,
}

#[async_trait]
impl AudioRecorder for StubRecorder {
    async fn start(&self) -> Result<Box<dyn Recording>, RecorderError> {
        if self.deny {
            return Err(RecorderError::PermissionDenied(
                "user dismissed the prompt".to_owned(),
            ));
        }
        Ok(Box::new(StubRecording {
            audio: self.audio.clone(),
        }))
    }
}

#[async_trait]
impl Recording for StubRecording {
    async fn stop(&mut self) -> Result<Vec<u8>, RecorderError> {
        if self.audio.is_empty() {
            return Err(RecorderError::EmptyRecording);
        }
        Ok(std::mem::take(&mut self.audio))
    }
}

pub fn microphone() -> Arc<StubRecorder> {
    Arc::new(StubRecorder {
        deny: false,
        audio: b"RIFF....WAVEfmt ".to_vec(),
    })
}

pub fn conversation_deps(
    service: Arc<dyn StudyService>,
    auth: Arc<dyn AuthProvider>,
    backend: Arc<dyn AssistantBackend>,
    recorder: Arc<dyn AudioRecorder>,
) -> (ConversationDeps, mpsc::UnboundedReceiver<Toast>) {
    let (notifier, toasts) = Notifier::channel();
    (
        ConversationDeps {
            service,
            auth,
            backend,
            recorder,
            notifier,
        },
        toasts,
    )
}

pub fn drain(toasts: &mut mpsc::UnboundedReceiver<Toast>) -> Vec<Toast> {
    let mut drained = Vec::new();
    while let Ok(toast) = toasts.try_recv() {
        drained.push(toast);
    }
    drained
}
