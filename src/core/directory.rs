//! Session directory: lists the user's sessions and creates new ones.

use crate::core::notifications::Notifier;
use crate::core::router::SelectSession;
use crate::core::traits::{AuthUser, StudyService};
use crate::infrastructure::entities::Session;
use di::Ref;
use log::error;
use uuid::Uuid;

pub const EMPTY_STATE_PROMPT: &str =
    "No study sessions yet. Create one to start learning with your assistant.";

/// Values typed into the "new session" dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSessionForm {
    pub open: bool,
    pub name: String,
    pub instruction: String,
}

pub struct SessionDirectory {
    service: Ref<dyn StudyService>,
    user: AuthUser,
    notifier: Notifier,
    on_select: SelectSession,
    sessions: Vec<Session>,
    form: CreateSessionForm,
}

impl SessionDirectory {
    pub fn new(
        service: Ref<dyn StudyService>,
        user: AuthUser,
        notifier: Notifier,
        on_select: SelectSession,
    ) -> Self {
        SessionDirectory {
            service,
            user,
            notifier,
            on_select,
            sessions: Vec::new(),
            form: CreateSessionForm::default(),
        }
    }

    /// Reloads the session list. On failure the list is left empty.
    pub async fn refresh(&mut self) {
        match self.service.list_sessions(self.user.id).await {
            Ok(sessions) => self.sessions = sessions,
            Err(e) => {
                error!("failed to load sessions: {e}");
                self.sessions.clear();
                self.notifier.error("Error", "Failed to load sessions");
            }
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Prompt shown instead of the list when there are no sessions.
    pub fn empty_state(&self) -> Option<&'static str> {
        self.sessions.is_empty().then_some(EMPTY_STATE_PROMPT)
    }

    pub fn form(&self) -> &CreateSessionForm {
        &self.form
    }

    pub fn open_create_dialog(&mut self) {
        self.form.open = true;
    }

    pub fn close_create_dialog(&mut self) {
        self.form.open = false;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.form.name = name.into();
    }

    pub fn set_instruction(&mut self, instruction: impl Into<String>) {
        self.form.instruction = instruction.into();
    }

    /// Creates a session from the dialog values.
    ///
    /// A blank name aborts before any store call. On failure the dialog stays open with its
    /// values intact.
    pub async fn create_session(&mut self) -> Option<Session> {
        if self.form.name.trim().is_empty() {
            self.notifier.error("Error", "Please enter a session name");
            return None;
        }

        let instruction = Some(self.form.instruction.as_str()).filter(|text| !text.trim().is_empty());
        match self
            .service
            .create_session(self.user.id, &self.form.name, instruction)
            .await
        {
            Ok(session) => {
                self.form = CreateSessionForm::default();
                self.notifier.success("Success", "Session created successfully");
                self.refresh().await;
                Some(session)
            }
            Err(e) => {
                error!("failed to create session: {e}");
                self.notifier.error("Error", "Failed to create session");
                None
            }
        }
    }

    pub fn select(&self, session_id: Uuid) {
        (self.on_select)(session_id);
    }

    /// Selects the session at the given position of the current list.
    pub fn select_at(&self, index: usize) -> bool {
        match self.sessions.get(index) {
            Some(session) => {
                self.select(session.id);
                true
            }
            None => false,
        }
    }
}
