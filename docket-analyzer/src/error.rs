//! Error types for the analysis client

use thiserror::Error;

/// Errors raised at the HTTP boundary
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The service answered with a non-success status
    #[error("HTTP {status}: {}", detail.as_deref().unwrap_or("no detail"))]
    Rejected { status: u16, detail: Option<String> },

    /// Network failure, timeout or unreadable body
    #[error("transport failure: {0}")]
    Transport(String),

    /// The body arrived but did not have the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Server-supplied detail message, if the service sent one
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// Errors surfaced by the task lifecycle coordinator
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Bad input; never reaches the network
    #[error("{0}")]
    Validation(String),

    /// The upload was rejected by the service
    #[error("{0}")]
    Submission(String),

    /// Network or parse failure on any call
    #[error("{0}")]
    Transport(String),

    /// The service reported the task as failed
    #[error("{0}")]
    RemoteTask(String),

    /// The operation is not valid in the current lifecycle state
    #[error("{0}")]
    Conflict(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ApiError> for AnalysisError {
    fn from(err: ApiError) -> Self {
        AnalysisError::Transport(err.to_string())
    }
}
