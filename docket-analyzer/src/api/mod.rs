//! Boundary to the remote analysis service

pub mod http;
pub mod types;

pub use http::HttpAnalysisApi;
pub use types::{
    AgentResultResponse, HealthResponse, ResultsResponse, StatusSnapshot, TaskSummary,
    UploadResponse,
};

use crate::error::ApiError;
use crate::results::AgentDescriptor;
use async_trait::async_trait;

/// A document ready to be uploaded
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Operations the coordinator needs from the remote service
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Upload a document and start analysis with the given agents.
    ///
    /// Takes the document by value so the body is streamed without a second buffer.
    async fn upload(&self, document: DocumentUpload, agents: &[String]) -> Result<UploadResponse, ApiError>;

    async fn fetch_status(&self, task_id: &str) -> Result<StatusSnapshot, ApiError>;

    async fn fetch_results(&self, task_id: &str) -> Result<ResultsResponse, ApiError>;

    async fn fetch_agent_result(&self, task_id: &str, agent_key: &str) -> Result<AgentResultResponse, ApiError>;

    /// Rendered document for one agent
    async fn fetch_agent_document(&self, task_id: &str, agent_key: &str) -> Result<Vec<u8>, ApiError>;

    /// Rendered document combining every agent
    async fn fetch_combined_document(&self, task_id: &str) -> Result<Vec<u8>, ApiError>;

    async fn list_agents(&self) -> Result<Vec<AgentDescriptor>, ApiError>;

    async fn list_tasks(&self) -> Result<Vec<TaskSummary>, ApiError>;

    async fn delete_task(&self, task_id: &str) -> Result<String, ApiError>;

    async fn health(&self) -> Result<HealthResponse, ApiError>;
}
