use super::types::{
    AgentCatalogResponse, AgentResultResponse, ErrorBody, HealthResponse, MessageResponse,
    ResultsResponse, StatusSnapshot, TaskListResponse, TaskSummary, UploadResponse,
};
use super::{AnalysisApi, DocumentUpload};
use crate::config::Config;
use crate::error::{AnalysisError, ApiError};
use crate::results::AgentDescriptor;
use async_trait::async_trait;
use reqwest::{header, multipart, Client, Response};
use serde::de::DeserializeOwned;

/// reqwest-backed client for the analysis service
#[derive(Clone)]
pub struct HttpAnalysisApi {
    client: Client,
    base_url: String,
    server_root: String,
}

impl HttpAnalysisApi {
    pub fn new(config: &Config) -> Result<Self, AnalysisError> {
        let base = url::Url::parse(&config.api_base_url)
            .map_err(|e| AnalysisError::Validation(format!("Invalid API URL '{}': {}", config.api_base_url, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AnalysisError::Validation(format!(
                "API URL must start with http:// or https://, got '{}'",
                config.api_base_url
            )));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .user_agent(concat!("docket-analyzer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnalysisError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            server_root: config.server_root(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-success response into [`ApiError::Rejected`], keeping the detail message
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message());
        log::debug!("[API] HTTP {} with body: {}", status, body);

        Err(ApiError::Rejected {
            status: status.as_u16(),
            detail,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        log::debug!("[API] GET {}", url);
        let response = Self::check(self.client.get(&url).send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.url(path);
        log::debug!("[API] GET {} (binary)", url);
        let response = Self::check(self.client.get(&url).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn content_type_for(file_name: &str) -> &'static str {
    if file_name.to_lowercase().ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}

#[async_trait]
impl AnalysisApi for HttpAnalysisApi {
    async fn upload(&self, document: DocumentUpload, agents: &[String]) -> Result<UploadResponse, ApiError> {
        let agents = agents.join(",");
        let size = document.size();
        let DocumentUpload { file_name, bytes } = document;
        let mime = content_type_for(&file_name);
        let part = multipart::Part::bytes(bytes).file_name(file_name).mime_str(mime)?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("agents", agents.clone());

        let url = self.url("/upload");
        log::info!(
            "[API] POST {} ({} bytes, agents: {})",
            url,
            size,
            agents
        );

        // The service also reads the selection from the query string
        let response = self
            .client
            .post(&url)
            .query(&[("agents", agents.as_str())])
            .multipart(form)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json::<UploadResponse>().await?)
    }

    async fn fetch_status(&self, task_id: &str) -> Result<StatusSnapshot, ApiError> {
        self.get_json(&format!("/status/{}", segment(task_id))).await
    }

    async fn fetch_results(&self, task_id: &str) -> Result<ResultsResponse, ApiError> {
        self.get_json(&format!("/result/{}", segment(task_id))).await
    }

    async fn fetch_agent_result(&self, task_id: &str, agent_key: &str) -> Result<AgentResultResponse, ApiError> {
        self.get_json(&format!("/result/{}/agent/{}", segment(task_id), segment(agent_key)))
            .await
    }

    async fn fetch_agent_document(&self, task_id: &str, agent_key: &str) -> Result<Vec<u8>, ApiError> {
        self.get_bytes(&format!("/result/{}/agent/{}/pdf", segment(task_id), segment(agent_key)))
            .await
    }

    async fn fetch_combined_document(&self, task_id: &str) -> Result<Vec<u8>, ApiError> {
        self.get_bytes(&format!("/result/{}/pdf", segment(task_id))).await
    }

    async fn list_agents(&self) -> Result<Vec<AgentDescriptor>, ApiError> {
        let catalog: AgentCatalogResponse = self.get_json("/agents").await?;
        Ok(catalog.into_descriptors())
    }

    async fn list_tasks(&self) -> Result<Vec<TaskSummary>, ApiError> {
        let list: TaskListResponse = self.get_json("/tasks").await?;
        Ok(list.tasks)
    }

    async fn delete_task(&self, task_id: &str) -> Result<String, ApiError> {
        let url = self.url(&format!("/task/{}", segment(task_id)));
        log::info!("[API] DELETE {}", url);
        let response = Self::check(self.client.delete(&url).send().await?).await?;
        let ack: MessageResponse = response.json().await?;
        Ok(ack.message)
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        let url = format!("{}/health", self.server_root);
        let response = Self::check(self.client.get(&url).send().await?).await?;
        Ok(response.json::<HealthResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_base_url() {
        let config = Config {
            api_base_url: "ftp://example.com/api/v1".to_string(),
            ..Config::default()
        };
        assert!(matches!(HttpAnalysisApi::new(&config), Err(AnalysisError::Validation(_))));

        let config = Config {
            api_base_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(HttpAnalysisApi::new(&config), Err(AnalysisError::Validation(_))));
    }

    #[test]
    fn test_url_building() {
        let config = Config {
            api_base_url: "http://localhost:8000/api/v1/".to_string(),
            ..Config::default()
        };
        let api = HttpAnalysisApi::new(&config).unwrap();
        assert_eq!(api.url("/upload"), "http://localhost:8000/api/v1/upload");
        assert_eq!(
            api.url(&format!("/status/{}", segment("a b/c"))),
            "http://localhost:8000/api/v1/status/a%20b%2Fc"
        );
        assert_eq!(api.server_root, "http://localhost:8000");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("processo.PDF"), "application/pdf");
        assert_eq!(content_type_for("notes.txt"), "application/octet-stream");
    }
}
