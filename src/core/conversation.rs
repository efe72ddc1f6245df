//! Conversation view: a session's transcript and the send/receive loop.
//!
//! Sends are executed by a single background worker fed through a bounded queue, so at most one
//! AI call is in flight per view. The typed-text entry point is additionally gated by the busy
//! flag; pasted images and voice turns queue up behind the current send.

use crate::core::notifications::Notifier;
use crate::core::router::GoBack;
use crate::core::traits::{
    AssistantBackend, AudioRecorder, AuthProvider, AuthUser, ChatRequest, Recording, StudyService,
};
use crate::core::transcript::{TranscriptLine, render_transcript};
use crate::error::ExchangeError;
use crate::infrastructure::entities::{Message, MessageKind};
use crate::media::{ClipboardItem, encode_base64};
use di::Ref;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

const SEND_QUEUE_DEPTH: usize = 1;

/// One turn waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    content: String,
    kind: MessageKind,
    image_base64: Option<String>,
}

impl Outgoing {
    pub fn text(content: impl Into<String>) -> Self {
        Outgoing {
            content: content.into(),
            kind: MessageKind::Text,
            image_base64: None,
        }
    }

    pub fn voice(transcript: impl Into<String>) -> Self {
        Outgoing {
            content: transcript.into(),
            kind: MessageKind::Voice,
            image_base64: None,
        }
    }

    pub fn image(caption: impl Into<String>, image_base64: String) -> Self {
        Outgoing {
            content: caption.into(),
            kind: MessageKind::Image,
            image_base64: Some(image_base64),
        }
    }

    fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.image_base64.is_none()
    }
}

#[derive(Debug)]
pub enum SendOutcome {
    /// Nothing to send, or a send was already running.
    Ignored,
    Sent(Message),
    Failed,
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent(_))
    }
}

pub struct SendTask {
    outgoing: Outgoing,
    return_channel: oneshot::Sender<SendOutcome>,
}

impl SendTask {
    pub fn new(outgoing: Outgoing) -> (SendTask, oneshot::Receiver<SendOutcome>) {
        let (sender, receiver) = oneshot::channel();

        (
            SendTask {
                outgoing,
                return_channel: sender,
            },
            receiver,
        )
    }
}

/// Collaborators a conversation view talks to.
#[derive(Clone)]
pub struct ConversationDeps {
    pub service: Ref<dyn StudyService>,
    pub auth: Arc<dyn AuthProvider>,
    pub backend: Arc<dyn AssistantBackend>,
    pub recorder: Arc<dyn AudioRecorder>,
    pub notifier: Notifier,
}

#[derive(Debug, Default)]
struct ViewState {
    session_name: String,
    instruction: String,
    messages: Vec<Message>,
    input: String,
}

#[derive(Clone)]
struct Exchange {
    session_id: Uuid,
    service: Ref<dyn StudyService>,
    auth: Arc<dyn AuthProvider>,
    backend: Arc<dyn AssistantBackend>,
    notifier: Notifier,
    state: Arc<RwLock<ViewState>>,
    pending: Arc<AtomicUsize>,
}

impl Exchange {
    async fn user(&self) -> Result<AuthUser, ExchangeError> {
        self.auth
            .current_user()
            .await?
            .ok_or(ExchangeError::Unauthenticated)
    }

    async fn load_session_metadata(&self) {
        let session = match self.user().await {
            Ok(user) => self
                .service
                .session_details(user.id, self.session_id)
                .await
                .map_err(ExchangeError::from),
            Err(e) => Err(e),
        };

        match session {
            Ok(session) => {
                let mut state = self.state.write().await;
                state.session_name = session.name;
                state.instruction = session.system_prompt;
            }
            Err(e) => error!("failed to load session {}: {e}", self.session_id),
        }
    }

    async fn load_messages(&self) {
        let messages = match self.user().await {
            Ok(user) => self
                .service
                .list_messages(user.id, self.session_id)
                .await
                .map_err(ExchangeError::from),
            Err(e) => Err(e),
        };

        match messages {
            Ok(messages) => self.state.write().await.messages = messages,
            Err(e) => error!("failed to load messages for {}: {e}", self.session_id),
        }
    }

    /// Auth check, AI call, insert, then a best-effort timestamp touch.
    async fn run(&self, outgoing: &Outgoing) -> Result<Message, ExchangeError> {
        let user = self.user().await?;
        let system_prompt = self.state.read().await.instruction.clone();

        let request = ChatRequest {
            message: outgoing.content.clone(),
            session_id: self.session_id,
            message_type: outgoing.kind,
            image_data: outgoing.image_base64.clone(),
            system_prompt,
        };
        let reply = self.backend.chat(&request).await?;

        let content = outgoing.content.clone();
        let message = match outgoing.kind {
            MessageKind::Text => {
                self.service
                    .create_text_message(user.id, self.session_id, content, reply)
                    .await?
            }
            MessageKind::Voice => {
                self.service
                    .create_voice_message(user.id, self.session_id, content, reply)
                    .await?
            }
            MessageKind::Image => {
                self.service
                    .create_image_message(user.id, self.session_id, content, reply)
                    .await?
            }
        };

        if let Err(e) = self.service.touch_session(user.id, self.session_id).await {
            warn!("failed to update session {} timestamp: {e}", self.session_id);
        }

        Ok(message)
    }
}

async fn send_worker(exchange: Exchange, mut task_queue: mpsc::Receiver<SendTask>) {
    while let Some(task) = task_queue.recv().await {
        debug!("sending {} turn in session {}", task.outgoing.kind, exchange.session_id);

        let outcome = match exchange.run(&task.outgoing).await {
            Ok(message) => {
                exchange.state.write().await.input.clear();
                exchange.load_messages().await;
                exchange.notifier.success("Success", "Message sent successfully");
                SendOutcome::Sent(message)
            }
            Err(e) => {
                error!("failed to send message: {e}");
                exchange.notifier.error("Error", "Failed to send message");
                SendOutcome::Failed
            }
        };

        exchange.pending.fetch_sub(1, Ordering::SeqCst);
        if task.return_channel.send(outcome).is_err() {
            debug!("send result dropped by caller");
        }
    }
}

pub struct ConversationView {
    exchange: Exchange,
    task_sender: mpsc::Sender<SendTask>,
    worker: JoinHandle<()>,
    recorder: Arc<dyn AudioRecorder>,
    recording: Option<Box<dyn Recording>>,
    on_back: GoBack,
}

impl ConversationView {
    /// Starts the send worker and loads the session's metadata and history.
    pub async fn open(session_id: Uuid, deps: ConversationDeps, on_back: GoBack) -> Self {
        let exchange = Exchange {
            session_id,
            service: deps.service,
            auth: deps.auth,
            backend: deps.backend,
            notifier: deps.notifier,
            state: Arc::new(RwLock::new(ViewState::default())),
            pending: Arc::new(AtomicUsize::new(0)),
        };

        let (task_sender, task_receiver) = mpsc::channel(SEND_QUEUE_DEPTH);
        let worker = tokio::spawn(send_worker(exchange.clone(), task_receiver));

        let view = ConversationView {
            exchange,
            task_sender,
            worker,
            recorder: deps.recorder,
            recording: None,
            on_back,
        };

        view.load_session_metadata().await;
        view.load_messages().await;
        view
    }

    pub fn session_id(&self) -> Uuid {
        self.exchange.session_id
    }

    pub async fn load_session_metadata(&self) {
        self.exchange.load_session_metadata().await;
    }

    /// Replaces the in-memory history with the stored one.
    pub async fn load_messages(&self) {
        self.exchange.load_messages().await;
    }

    pub async fn session_name(&self) -> String {
        self.exchange.state.read().await.session_name.clone()
    }

    pub async fn instruction(&self) -> String {
        self.exchange.state.read().await.instruction.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.exchange.state.read().await.messages.clone()
    }

    pub async fn input(&self) -> String {
        self.exchange.state.read().await.input.clone()
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        self.exchange.state.write().await.input = text.into();
    }

    /// True while a send is queued or in flight.
    pub fn is_busy(&self) -> bool {
        self.exchange.pending.load(Ordering::SeqCst) > 0
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    pub async fn transcript(&self) -> Vec<TranscriptLine> {
        let messages = self.exchange.state.read().await;
        render_transcript(&messages.messages, self.is_busy())
    }

    /// Sends whatever is in the input field as a text turn.
    pub async fn submit(&self) -> SendOutcome {
        let input = self.input().await;
        self.send(Outgoing::text(input)).await
    }

    /// Sends a turn unless one is already running or there is nothing to send.
    pub async fn send(&self, outgoing: Outgoing) -> SendOutcome {
        if self.is_busy() {
            debug!("send ignored, another send is running");
            return SendOutcome::Ignored;
        }
        self.dispatch(outgoing).await
    }

    async fn dispatch(&self, outgoing: Outgoing) -> SendOutcome {
        if outgoing.is_empty() {
            return SendOutcome::Ignored;
        }

        let (task, result) = SendTask::new(outgoing);
        self.exchange.pending.fetch_add(1, Ordering::SeqCst);

        if self.task_sender.send(task).await.is_err() {
            self.exchange.pending.fetch_sub(1, Ordering::SeqCst);
            error!("send worker for {} is gone", self.exchange.session_id);
            self.exchange.notifier.error("Error", "Failed to send message");
            return SendOutcome::Failed;
        }

        result.await.unwrap_or(SendOutcome::Failed)
    }

    /// Starts a recording, or stops the running one and sends its transcription as a voice turn.
    ///
    /// Returns the send outcome when a recording was stopped and transcribed.
    pub async fn toggle_recording(&mut self) -> Option<SendOutcome> {
        let Some(mut recording) = self.recording.take() else {
            match self.recorder.start().await {
                Ok(recording) => {
                    info!("recording started");
                    self.recording = Some(recording);
                }
                Err(e) => {
                    error!("failed to start recording: {e}");
                    self.exchange
                        .notifier
                        .error("Error", "Could not access microphone");
                }
            }
            return None;
        };

        let audio = match recording.stop().await {
            Ok(audio) => audio,
            Err(e) => {
                error!("failed to finish recording: {e}");
                self.exchange
                    .notifier
                    .error("Error", "Failed to capture audio");
                return None;
            }
        };

        let transcript = match self.exchange.backend.transcribe(&encode_base64(&audio)).await {
            Ok(text) => text,
            Err(e) => {
                error!("failed to transcribe audio: {e}");
                self.exchange
                    .notifier
                    .error("Error", "Failed to transcribe audio");
                return None;
            }
        };

        Some(self.dispatch(Outgoing::voice(transcript)).await)
    }

    /// Sends a picked image file as an image turn without caption.
    pub async fn upload_image(&self, item: ClipboardItem) -> SendOutcome {
        if !item.is_image() {
            self.exchange
                .notifier
                .error("Error", "Please choose an image file");
            return SendOutcome::Ignored;
        }
        self.dispatch(Outgoing::image("", encode_base64(&item.bytes)))
            .await
    }

    /// Sends every image in a paste as its own turn, in order. Non-image items are skipped.
    pub async fn paste(&self, items: Vec<ClipboardItem>) -> Vec<SendOutcome> {
        let mut outcomes = Vec::new();
        for item in items.into_iter().filter(ClipboardItem::is_image) {
            outcomes.push(
                self.dispatch(Outgoing::image("", encode_base64(&item.bytes)))
                    .await,
            );
        }
        outcomes
    }

    /// Leaves the conversation and returns control to the directory.
    pub fn back(self) {
        (self.on_back)();
    }
}

impl Drop for ConversationView {
    fn drop(&mut self) {
        self.worker.abort();
    }
}
