//! Task lifecycle types

use crate::results::AgentReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a task as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[serde(alias = "pending")]
    Queued,
    Processing,
    Completed,
    Error,
    Cancelled,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Queued
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Processing => write!(f, "processing"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Error => write!(f, "error"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl TaskStatus {
    /// Whether the service is still working on the task
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Queued | TaskStatus::Processing)
    }
}

/// The one live analysis job tracked by the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Opaque id assigned by the service
    pub id: String,
    pub status: TaskStatus,
    /// 0 to 100, never decreases while the task is active
    pub progress: u8,
    /// Only set when `status` is `Error`
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: TaskStatus::Queued,
            progress: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy a polled status and progress onto the task
    pub fn apply(&mut self, status: TaskStatus, progress: i64, error: Option<String>) {
        let progress = progress.clamp(0, 100) as u8;
        if status.is_active() {
            self.progress = self.progress.max(progress);
        } else {
            self.progress = progress;
        }
        self.status = status;
        self.error_message = if status == TaskStatus::Error { error } else { None };
        self.updated_at = Utc::now();
    }

    /// Short ID for display (first 8 chars)
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(8) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }

    /// Human label for the current progress phase
    pub fn phase(&self) -> &'static str {
        progress_phase(self.progress)
    }
}

/// Progress buckets shown while the service works
pub fn progress_phase(progress: u8) -> &'static str {
    match progress {
        0..=10 => "Preparando análise...",
        11..=40 => "Carregando documento...",
        41..=70 => "Executando agentes especializados...",
        71..=90 => "Gerando relatório consolidado...",
        _ => "Finalizando análise...",
    }
}

/// Why a task ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    /// The service reported `status = error`
    RemoteTask,
    /// A status or result fetch failed
    Transport,
}

/// State of the lifecycle coordinator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    Submitting,
    Polling { task: Task },
    Completed { task: Task, reports: Vec<AgentReport> },
    Failed {
        task: Option<Task>,
        cause: FailureCause,
        message: String,
    },
    Cancelled { task: Task },
}

impl Default for LifecycleState {
    fn default() -> Self {
        LifecycleState::Idle
    }
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Submitting => "submitting",
            LifecycleState::Polling { .. } => "polling",
            LifecycleState::Completed { .. } => "completed",
            LifecycleState::Failed { .. } => "failed",
            LifecycleState::Cancelled { .. } => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Completed { .. } | LifecycleState::Failed { .. } | LifecycleState::Cancelled { .. }
        )
    }

    /// Whether a submission or poll loop is in progress
    pub fn is_busy(&self) -> bool {
        matches!(self, LifecycleState::Submitting | LifecycleState::Polling { .. })
    }

    pub fn task(&self) -> Option<&Task> {
        match self {
            LifecycleState::Polling { task }
            | LifecycleState::Completed { task, .. }
            | LifecycleState::Cancelled { task } => Some(task),
            LifecycleState::Failed { task, .. } => task.as_ref(),
            LifecycleState::Idle | LifecycleState::Submitting => None,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Human-readable byte count, base 1024
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[exp])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_never_decreases_while_active() {
        let mut task = Task::new("abc");
        task.apply(TaskStatus::Processing, 40, None);
        assert_eq!(task.progress, 40);

        task.apply(TaskStatus::Processing, 30, None);
        assert_eq!(task.progress, 40);

        task.apply(TaskStatus::Processing, 250, None);
        assert_eq!(task.progress, 100);

        task.apply(TaskStatus::Processing, -5, None);
        assert_eq!(task.progress, 100);
    }

    #[test]
    fn test_error_message_only_on_error() {
        let mut task = Task::new("abc");
        task.apply(TaskStatus::Processing, 10, Some("ignored".into()));
        assert_eq!(task.error_message, None);

        task.apply(TaskStatus::Error, 10, Some("PDF corrompido".into()));
        assert_eq!(task.error_message.as_deref(), Some("PDF corrompido"));
    }

    #[test]
    fn test_progress_phase_buckets() {
        assert_eq!(progress_phase(0), "Preparando análise...");
        assert_eq!(progress_phase(10), "Preparando análise...");
        assert_eq!(progress_phase(30), "Carregando documento...");
        assert_eq!(progress_phase(70), "Executando agentes especializados...");
        assert_eq!(progress_phase(90), "Gerando relatório consolidado...");
        assert_eq!(progress_phase(100), "Finalizando análise...");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(50 * 1024 * 1024), "50 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(Task::new("0123456789abcdef").short_id(), "01234567");
        assert_eq!(Task::new("abc").short_id(), "abc");
    }

    #[test]
    fn test_state_helpers() {
        assert!(!LifecycleState::Idle.is_terminal());
        assert!(LifecycleState::Submitting.is_busy());
        let cancelled = LifecycleState::Cancelled { task: Task::new("t") };
        assert!(cancelled.is_terminal());
        assert_eq!(cancelled.task().map(|t| t.id.as_str()), Some("t"));
        assert_eq!(cancelled.to_string(), "cancelled");
    }
}
