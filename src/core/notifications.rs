//! Transient toast notifications raised by the views.

use log::debug;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub title: String,
    pub description: String,
}

/// Sending half of the toast queue, cloned into every view.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: mpsc::UnboundedSender<Toast>,
}

impl Notifier {
    pub fn channel() -> (Notifier, mpsc::UnboundedReceiver<Toast>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Notifier { sender }, receiver)
    }

    pub fn success(&self, title: &str, description: impl Into<String>) {
        self.push(ToastLevel::Success, title, description.into());
    }

    pub fn error(&self, title: &str, description: impl Into<String>) {
        self.push(ToastLevel::Error, title, description.into());
    }

    fn push(&self, level: ToastLevel, title: &str, description: String) {
        let toast = Toast {
            level,
            title: title.to_owned(),
            description,
        };

        if self.sender.send(toast).is_err() {
            debug!("toast dropped, no receiver");
        }
    }
}
