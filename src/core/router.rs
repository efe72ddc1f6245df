//! Top-level navigation: auth gating and the selected session.

use crate::core::traits::{AuthEvent, AuthProvider, AuthUser};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPhase {
    Resolving,
    SignedOut,
    SignedIn(AuthUser),
}

/// What the front-end should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Loading,
    SignIn,
    Directory,
    Conversation(Uuid),
}

/// Callback handed to the directory to pick a session.
pub type SelectSession = Arc<dyn Fn(Uuid) + Send + Sync>;

/// Callback handed to the conversation view to return to the directory.
pub type GoBack = Arc<dyn Fn() + Send + Sync>;

pub struct SessionRouter {
    phase: watch::Receiver<AuthPhase>,
    selection: Arc<watch::Sender<Option<Uuid>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionRouter {
    /// Subscribes to auth changes and queries the current user. Whichever answers last wins.
    pub fn mount(auth: Arc<dyn AuthProvider>) -> SessionRouter {
        let (phase_sender, phase) = watch::channel(AuthPhase::Resolving);
        let phase_sender = Arc::new(phase_sender);
        let selection = Arc::new(watch::channel(None).0);

        let mut events = auth.subscribe();
        let listener = {
            let phase_sender = phase_sender.clone();
            let selection = selection.clone();
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) => {
                            debug!("auth event: {event:?}");
                            if event == AuthEvent::SignedOut {
                                selection.send_replace(None);
                            }
                            phase_sender.send_replace(match event.user() {
                                Some(user) => AuthPhase::SignedIn(user.clone()),
                                None => AuthPhase::SignedOut,
                            });
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("auth listener skipped {skipped} events");
                        }
                        Err(RecvError::Closed) => return,
                    }
                }
            })
        };

        let query = tokio::spawn(async move {
            let phase = match auth.current_user().await {
                Ok(Some(user)) => AuthPhase::SignedIn(user),
                Ok(None) => AuthPhase::SignedOut,
                Err(e) => {
                    error!("failed to query auth state: {e}");
                    AuthPhase::SignedOut
                }
            };
            phase_sender.send_replace(phase);
        });

        SessionRouter {
            phase,
            selection,
            tasks: vec![listener, query],
        }
    }

    pub fn screen(&self) -> Screen {
        match &*self.phase.borrow() {
            AuthPhase::Resolving => Screen::Loading,
            AuthPhase::SignedOut => Screen::SignIn,
            AuthPhase::SignedIn(_) => match *self.selection.borrow() {
                Some(session_id) => Screen::Conversation(session_id),
                None => Screen::Directory,
            },
        }
    }

    /// Waits until the auth state is resolved and returns the screen to show.
    pub async fn settle(&mut self) -> Screen {
        if self
            .phase
            .wait_for(|phase| *phase != AuthPhase::Resolving)
            .await
            .is_err()
        {
            warn!("auth state publisher went away");
        }
        self.screen()
    }

    /// Waits for the next auth state change.
    pub async fn auth_changed(&mut self) -> Screen {
        if self.phase.changed().await.is_err() {
            warn!("auth state publisher went away");
        }
        self.screen()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        match &*self.phase.borrow() {
            AuthPhase::SignedIn(user) => Some(user.clone()),
            _ => None,
        }
    }

    pub fn on_select(&self) -> SelectSession {
        let selection = self.selection.clone();
        Arc::new(move |session_id| {
            info!("opening session {session_id}");
            selection.send_replace(Some(session_id));
        })
    }

    pub fn on_back(&self) -> GoBack {
        let selection = self.selection.clone();
        Arc::new(move || {
            selection.send_replace(None);
        })
    }

    /// Stops listening for auth changes.
    pub fn unmount(mut self) {
        self.abort_tasks();
    }

    fn abort_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for SessionRouter {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}
