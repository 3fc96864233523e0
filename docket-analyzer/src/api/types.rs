//! Wire types of the analysis API

use crate::lifecycle::types::TaskStatus;
use crate::results::AgentDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Response of `POST /upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub task_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `GET /status/{task_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `GET /result/{task_id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultsResponse {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub results: Option<Map<String, Value>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `GET /result/{task_id}/agent/{key}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResultResponse {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
    pub result: Value,
}

/// Response of `GET /agents`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCatalogResponse {
    pub agents: HashMap<String, AgentDescriptor>,
}

impl AgentCatalogResponse {
    /// Flatten into descriptors, filling each key from its map entry
    pub fn into_descriptors(self) -> Vec<AgentDescriptor> {
        self.agents
            .into_iter()
            .map(|(key, mut descriptor)| {
                descriptor.key = key;
                descriptor
            })
            .collect()
    }
}

/// One entry of `GET /tasks`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskSummary>,
}

/// Response of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Generic `{ message }` acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body used by the service on non-success responses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    /// Best human-readable message in the body.
    ///
    /// `detail` is usually a string, but validation failures send a list of objects
    /// with a `msg` field.
    pub fn message(&self) -> Option<String> {
        match &self.detail {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Array(items)) => {
                let msgs: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect();
                if msgs.is_empty() { None } else { Some(msgs.join("; ")) }
            }
            _ => self.error.clone().filter(|e| !e.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_snapshot_accepts_pending_alias() {
        let snap: StatusSnapshot = serde_json::from_value(json!({
            "task_id": "t1",
            "status": "pending",
            "progress": 0,
            "results": {},
            "error": null
        }))
        .unwrap();
        assert_eq!(snap.status, TaskStatus::Queued);
        assert_eq!(snap.error, None);
    }

    #[test]
    fn test_catalog_into_descriptors_sets_keys() {
        let catalog: AgentCatalogResponse = serde_json::from_value(json!({
            "agents": {
                "defesa": { "name": "🛡️ Agente Defesa", "description": "Defesa" }
            }
        }))
        .unwrap();
        let agents = catalog.into_descriptors();
        assert_eq!(agents[0].key, "defesa");
        assert_eq!(agents[0].name, "🛡️ Agente Defesa");
    }

    #[test]
    fn test_error_body_message() {
        let body: ErrorBody = serde_json::from_value(json!({"detail": "Tarefa não encontrada"})).unwrap();
        assert_eq!(body.message().as_deref(), Some("Tarefa não encontrada"));

        let body: ErrorBody = serde_json::from_value(json!({
            "detail": [{"loc": ["body", "file"], "msg": "field required"}]
        }))
        .unwrap();
        assert_eq!(body.message().as_deref(), Some("field required"));

        let body: ErrorBody = serde_json::from_value(json!({"detail": ""})).unwrap();
        assert_eq!(body.message(), None);
    }
}
