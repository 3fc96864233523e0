//! Notifications surfaced to the user while a task runs
//!
//! The coordinator never renders anything itself. Every submit, poll and terminal
//! transition is reported to a [`NotificationSink`], which decides how to show it.

use serde::Serialize;
use tokio::sync::mpsc;

/// Event types for lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventType {
    // Submission events
    TaskSubmitting,
    TaskSubmitted,
    SubmissionRejected,
    // Polling events
    TaskProgress,
    // Terminal events
    TaskCompleted,
    TaskFailed,
    TaskCancelled,
    TaskReset,
    /// Operation rejected for the current state
    InvalidOperation,
    // Document downloads
    DownloadStarted,
    DownloadCompleted,
    DownloadFailed,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskSubmitting => "task.submitting",
            Self::TaskSubmitted => "task.submitted",
            Self::SubmissionRejected => "submission.rejected",
            Self::TaskProgress => "task.progress",
            Self::TaskCompleted => "task.completed",
            Self::TaskFailed => "task.failed",
            Self::TaskCancelled => "task.cancelled",
            Self::TaskReset => "task.reset",
            Self::InvalidOperation => "lifecycle.conflict",
            Self::DownloadStarted => "download.started",
            Self::DownloadCompleted => "download.completed",
            Self::DownloadFailed => "download.failed",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
    Warning,
    Info,
}

impl NotificationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationLevel::Success => "success",
            NotificationLevel::Error => "error",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Info => "info",
        }
    }
}

/// A human-readable message about a lifecycle event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub event: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, event: EventType, message: impl Into<String>) -> Self {
        Self {
            level,
            event,
            task_id: None,
            message: message.into(),
        }
    }

    pub fn success(event: EventType, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, event, message)
    }

    pub fn error(event: EventType, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, event, message)
    }

    pub fn warning(event: EventType, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, event, message)
    }

    pub fn info(event: EventType, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, event, message)
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level.as_str(), self.message)
    }
}

/// Capability used by the coordinator to surface messages
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => log::error!("[NOTIFY] {} {}", notification.event, notification.message),
            NotificationLevel::Warning => log::warn!("[NOTIFY] {} {}", notification.event, notification.message),
            NotificationLevel::Success | NotificationLevel::Info => {
                log::info!("[NOTIFY] {} {}", notification.event, notification.message)
            }
        }
    }
}

/// Forwards notifications to an unbounded channel
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            log::debug!("[NOTIFY] Receiver dropped, notification discarded");
        }
    }
}

/// Discards everything
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _notification: Notification) {}
}
