use tokio::sync::mpsc;
use tracing::{error, info};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A toast-style message for the person using the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }

    /// What to show for a failed request, or `None` when it stays silent.
    pub fn for_failure(err: &Error) -> Option<Self> {
        if !err.should_notify() {
            return None;
        }
        let notification = match err {
            Error::Api { detail, .. } => Self::error("Request failed", detail.summary()),
            Error::VersionConflict { .. } => Self::error(
                "Update conflict",
                "This job was changed by someone else. Reload it and try again.",
            ),
            Error::Timeout => Self::error("Request failed", "The server took too long to respond"),
            Error::Transport(_) => Self::error("Request failed", "Could not reach the server"),
            other => Self::error("Request failed", other.to_string()),
        };
        Some(notification)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log. Used by headless processes.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => {
                error!(title = %notification.title, "{}", notification.message)
            }
            _ => info!(title = %notification.title, "{}", notification.message),
        }
    }
}

/// Forwards notifications to a UI loop over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        // A closed receiver means the UI is gone; nothing left to show.
        let _ = self.tx.send(notification);
    }
}
