//! Saving rendered analysis documents to disk

use crate::api::AnalysisApi;
use crate::error::AnalysisError;
use crate::notify::{EventType, Notification, NotificationSink};
use crate::results::types::agent_display_name;
use std::path::{Path, PathBuf};

/// Label used for the combined document in a [`DownloadSummary`]
pub const COMBINED_DOCUMENT: &str = "completo";

/// Outcome of saving several documents
#[derive(Debug, Default)]
pub struct DownloadSummary {
    pub saved: Vec<PathBuf>,
    /// Document label (agent key or [`COMBINED_DOCUMENT`]) with its error
    pub failed: Vec<(String, AnalysisError)>,
}

impl DownloadSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// File name for one agent's document
pub fn agent_document_name(agent_key: &str, task_id: &str) -> String {
    format!("{}_{}.pdf", sanitize(agent_key), sanitize(task_id))
}

/// File name for the combined document
pub fn combined_document_name(task_id: &str) -> String {
    format!("analise_completa_{}.pdf", sanitize(task_id))
}

/// Keep ids usable as file names
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

pub async fn save_agent_document(
    api: &dyn AnalysisApi,
    sink: &dyn NotificationSink,
    task_id: &str,
    agent_key: &str,
    dest_dir: &Path,
) -> Result<PathBuf, AnalysisError> {
    let name = agent_display_name(agent_key);
    sink.notify(
        Notification::info(EventType::DownloadStarted, format!("Gerando PDF do {}...", name)).with_task(task_id),
    );

    let bytes = match api.fetch_agent_document(task_id, agent_key).await {
        Ok(bytes) => bytes,
        Err(err) => {
            sink.notify(
                Notification::error(EventType::DownloadFailed, format!("Erro ao baixar PDF: {}", err))
                    .with_task(task_id),
            );
            return Err(err.into());
        }
    };

    let path = dest_dir.join(agent_document_name(agent_key, task_id));
    write_document(&path, &bytes, sink, task_id).await?;
    sink.notify(
        Notification::success(EventType::DownloadCompleted, format!("PDF do {} baixado com sucesso", name))
            .with_task(task_id),
    );
    Ok(path)
}

pub async fn save_combined_document(
    api: &dyn AnalysisApi,
    sink: &dyn NotificationSink,
    task_id: &str,
    dest_dir: &Path,
) -> Result<PathBuf, AnalysisError> {
    sink.notify(Notification::info(EventType::DownloadStarted, "Gerando relatório completo...").with_task(task_id));

    let bytes = match api.fetch_combined_document(task_id).await {
        Ok(bytes) => bytes,
        Err(err) => {
            sink.notify(
                Notification::error(EventType::DownloadFailed, format!("Erro ao baixar relatório: {}", err))
                    .with_task(task_id),
            );
            return Err(err.into());
        }
    };

    let path = dest_dir.join(combined_document_name(task_id));
    write_document(&path, &bytes, sink, task_id).await?;
    sink.notify(
        Notification::success(EventType::DownloadCompleted, "Relatório completo baixado com sucesso")
            .with_task(task_id),
    );
    Ok(path)
}

async fn write_document(
    path: &Path,
    bytes: &[u8],
    sink: &dyn NotificationSink,
    task_id: &str,
) -> Result<(), AnalysisError> {
    let result = async {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await
    }
    .await;

    if let Err(err) = result {
        log::error!("[DOWNLOAD] Failed to write {}: {}", path.display(), err);
        sink.notify(
            Notification::error(EventType::DownloadFailed, format!("Erro ao salvar {}: {}", path.display(), err))
                .with_task(task_id),
        );
        return Err(err.into());
    }

    log::info!("[DOWNLOAD] Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
