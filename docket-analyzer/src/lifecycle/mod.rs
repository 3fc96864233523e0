//! Task lifecycle coordinator
//!
//! Owns one analysis task at a time, from upload to a terminal state:
//!
//! ```text
//! Idle → Submitting → Polling → Completed
//!                            ↘ Failed
//!                            ↘ Cancelled
//! ```
//!
//! - `submit` validates locally, uploads, and starts the poll loop
//! - the poll loop fetches `/status/{id}` once per tick until the task is terminal
//! - on `completed` one more fetch retrieves the results, which are aggregated
//! - `cancel` stops the loop without telling the service
//! - `reset` returns a terminal machine to `Idle`
//!
//! Every transition is published on a `watch` channel and reported to the
//! [`NotificationSink`].

pub mod types;

pub use types::{FailureCause, LifecycleState, Task, TaskStatus};

use crate::api::{AnalysisApi, DocumentUpload, ResultsResponse, StatusSnapshot};
use crate::config::Config;
use crate::download::{self, DownloadSummary};
use crate::error::{AnalysisError, ApiError};
use crate::notify::{EventType, Notification, NotificationSink};
use crate::results::{self, AgentReport, AgentResult};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use types::format_file_size;

/// Shown when the service rejects an upload without a detail message
pub const GENERIC_UPLOAD_ERROR: &str = "Erro no upload";
/// Shown when a status fetch fails while polling
pub const POLL_ERROR_MESSAGE: &str = "Erro ao acompanhar progresso";
/// Shown when the service reports an error without a message
pub const UNKNOWN_TASK_ERROR: &str = "Erro desconhecido";
/// Shortest accepted poll period; `interval` rejects a zero period
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Handle on the running poll loop
struct PollHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl PollHandle {
    /// Stop further ticks. Safe to call more than once.
    fn stop(&self) {
        self.token.cancel();
    }
}

struct Machine {
    state: LifecycleState,
    /// Bumped on every submission; poll results from older epochs are dropped
    epoch: u64,
    poller: Option<PollHandle>,
}

impl Machine {
    fn stop_poller(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
    }

    /// Task of the current epoch, if the machine is still polling it
    fn polling_task(&self, epoch: u64) -> Option<Task> {
        match &self.state {
            LifecycleState::Polling { task } if self.epoch == epoch => Some(task.clone()),
            _ => None,
        }
    }
}

struct Inner {
    api: Arc<dyn AnalysisApi>,
    sink: Arc<dyn NotificationSink>,
    config: Config,
    machine: Mutex<Machine>,
    state_tx: watch::Sender<LifecycleState>,
}

/// What the poll loop does after applying a status snapshot
#[derive(Debug, PartialEq, Eq)]
enum PollStep {
    Continue,
    FetchResults,
    Stop,
}

impl Inner {
    fn transition(&self, machine: &mut Machine, next: LifecycleState) {
        if machine.state.name() != next.name() {
            log::info!("[LIFECYCLE] {} → {}", machine.state, next);
        }
        machine.state = next.clone();
        self.state_tx.send_replace(next);
    }

    fn notify(&self, notification: Notification) {
        self.sink.notify(notification);
    }

    /// Apply one polled status snapshot
    fn apply_status(&self, epoch: u64, outcome: Result<StatusSnapshot, ApiError>) -> PollStep {
        let (step, notification) = {
            let mut machine = self.machine.lock();
            let Some(mut task) = machine.polling_task(epoch) else {
                log::debug!("[POLL] Discarding status for a task that is no longer polled");
                return PollStep::Stop;
            };

            match outcome {
                Err(err) => {
                    log::error!("[POLL] Status fetch for {} failed: {}", task.id, err);
                    machine.stop_poller();
                    let id = task.id.clone();
                    self.transition(
                        &mut machine,
                        LifecycleState::Failed {
                            task: Some(task),
                            cause: FailureCause::Transport,
                            message: POLL_ERROR_MESSAGE.to_string(),
                        },
                    );
                    (
                        PollStep::Stop,
                        Notification::error(EventType::TaskFailed, POLL_ERROR_MESSAGE).with_task(id),
                    )
                }
                Ok(snapshot) => {
                    task.apply(snapshot.status, snapshot.progress, snapshot.error.clone());
                    log::debug!(
                        "[POLL] Task {} is {} at {}%",
                        task.short_id(),
                        task.status,
                        task.progress
                    );
                    let id = task.id.clone();

                    match snapshot.status {
                        TaskStatus::Completed => {
                            // Results are fetched by the loop; stay in Polling until they arrive
                            machine.stop_poller();
                            let progress = task.progress;
                            self.transition(&mut machine, LifecycleState::Polling { task });
                            (
                                PollStep::FetchResults,
                                Notification::info(
                                    EventType::TaskProgress,
                                    format!("Carregando resultados... ({}%)", progress),
                                )
                                .with_task(id),
                            )
                        }
                        TaskStatus::Error => {
                            machine.stop_poller();
                            let message = snapshot
                                .error
                                .filter(|e| !e.is_empty())
                                .unwrap_or_else(|| UNKNOWN_TASK_ERROR.to_string());
                            self.transition(
                                &mut machine,
                                LifecycleState::Failed {
                                    task: Some(task),
                                    cause: FailureCause::RemoteTask,
                                    message: message.clone(),
                                },
                            );
                            (
                                PollStep::Stop,
                                Notification::error(
                                    EventType::TaskFailed,
                                    format!("Erro na análise: {}", message),
                                )
                                .with_task(id),
                            )
                        }
                        TaskStatus::Cancelled => {
                            machine.stop_poller();
                            self.transition(&mut machine, LifecycleState::Cancelled { task });
                            (
                                PollStep::Stop,
                                Notification::warning(
                                    EventType::TaskCancelled,
                                    "Análise cancelada pelo serviço",
                                )
                                .with_task(id),
                            )
                        }
                        TaskStatus::Queued | TaskStatus::Processing => {
                            let message = format!("{} ({}%)", task.phase(), task.progress);
                            self.transition(&mut machine, LifecycleState::Polling { task });
                            (
                                PollStep::Continue,
                                Notification::info(EventType::TaskProgress, message).with_task(id),
                            )
                        }
                    }
                }
            }
        };

        self.notify(notification);
        step
    }

    /// Apply the result set fetched after a `completed` status
    fn finish_completed(&self, epoch: u64, outcome: Result<ResultsResponse, ApiError>) {
        let notification = {
            let mut machine = self.machine.lock();
            let Some(mut task) = machine.polling_task(epoch) else {
                log::debug!("[POLL] Discarding results for a task that is no longer polled");
                return;
            };
            let id = task.id.clone();

            match outcome {
                Err(err) => {
                    log::error!("[POLL] Result fetch for {} failed: {}", id, err);
                    let message = format!("Erro ao carregar resultados: {}", err);
                    self.transition(
                        &mut machine,
                        LifecycleState::Failed {
                            task: Some(task),
                            cause: FailureCause::Transport,
                            message: message.clone(),
                        },
                    );
                    Notification::error(EventType::TaskFailed, message).with_task(id)
                }
                Ok(response) if response.status == Some(TaskStatus::Error) => {
                    let message = response
                        .error
                        .filter(|e| !e.is_empty())
                        .unwrap_or_else(|| UNKNOWN_TASK_ERROR.to_string());
                    task.apply(TaskStatus::Error, task.progress as i64, Some(message.clone()));
                    self.transition(
                        &mut machine,
                        LifecycleState::Failed {
                            task: Some(task),
                            cause: FailureCause::RemoteTask,
                            message: message.clone(),
                        },
                    );
                    Notification::error(EventType::TaskFailed, format!("Erro na análise: {}", message))
                        .with_task(id)
                }
                Ok(response) => {
                    let reports = results::aggregate(response.results.as_ref());
                    log::info!("[LIFECYCLE] Task {} completed with {} agent results", id, reports.len());
                    task.apply(TaskStatus::Completed, 100, None);
                    self.transition(&mut machine, LifecycleState::Completed { task, reports });
                    Notification::success(EventType::TaskCompleted, "Análise concluída com sucesso!")
                        .with_task(id)
                }
            }
        };

        self.notify(notification);
    }
}

/// Timer-driven status polling for one task
async fn run_poll_loop(inner: Arc<Inner>, epoch: u64, task_id: String, token: CancellationToken) {
    let period = inner.config.poll_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    log::debug!("[POLL] Polling {} every {:?}", task_id, period);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                log::debug!("[POLL] Loop for {} stopped", task_id);
                return;
            }
            _ = ticker.tick() => {}
        }

        // An in-flight fetch is not aborted by cancel; its result is discarded instead
        let outcome = inner.api.fetch_status(&task_id).await;
        match inner.apply_status(epoch, outcome) {
            PollStep::Continue => continue,
            PollStep::Stop => return,
            PollStep::FetchResults => break,
        }
    }

    let outcome = inner.api.fetch_results(&task_id).await;
    inner.finish_completed(epoch, outcome);
}

/// Coordinates submission, polling, cancellation and result aggregation for one
/// analysis task at a time
pub struct TaskLifecycleClient {
    inner: Arc<Inner>,
}

impl TaskLifecycleClient {
    pub fn new(api: Arc<dyn AnalysisApi>, sink: Arc<dyn NotificationSink>, mut config: Config) -> Self {
        if config.poll_interval < MIN_POLL_INTERVAL {
            log::warn!(
                "[LIFECYCLE] Poll interval {:?} is too short; using {:?}",
                config.poll_interval,
                MIN_POLL_INTERVAL
            );
            config.poll_interval = MIN_POLL_INTERVAL;
        }
        let (state_tx, _) = watch::channel(LifecycleState::Idle);
        Self {
            inner: Arc::new(Inner {
                api,
                sink,
                config,
                machine: Mutex::new(Machine {
                    state: LifecycleState::Idle,
                    epoch: 0,
                    poller: None,
                }),
                state_tx,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn api(&self) -> &Arc<dyn AnalysisApi> {
        &self.inner.api
    }

    /// Snapshot of the current state
    pub fn state(&self) -> LifecycleState {
        self.inner.machine.lock().state.clone()
    }

    /// The live task, if any
    pub fn task(&self) -> Option<Task> {
        self.inner.machine.lock().state.task().cloned()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.inner.state_tx.subscribe()
    }

    /// Check a submission without touching the network
    pub fn validate(&self, document: &DocumentUpload, agent_keys: &[String]) -> Result<Vec<String>, AnalysisError> {
        validate_submission(&self.inner.config, &document.file_name, document.size(), agent_keys)
    }

    /// Upload a document and start polling its analysis. Returns the task id.
    pub async fn submit(&self, document: DocumentUpload, agent_keys: &[String]) -> Result<String, AnalysisError> {
        let agents = match self.validate(&document, agent_keys) {
            Ok(agents) => agents,
            Err(err) => {
                log::warn!("[LIFECYCLE] Submission rejected locally: {}", err);
                self.inner
                    .notify(Notification::error(EventType::SubmissionRejected, err.to_string()));
                return Err(err);
            }
        };

        let epoch = {
            let mut machine = self.inner.machine.lock();
            if machine.state.is_busy() {
                let err = AnalysisError::Conflict(format!(
                    "Já existe uma análise em andamento (estado: {})",
                    machine.state
                ));
                drop(machine);
                self.inner
                    .notify(Notification::warning(EventType::InvalidOperation, err.to_string()));
                return Err(err);
            }
            machine.epoch += 1;
            self.inner.transition(&mut machine, LifecycleState::Submitting);
            machine.epoch
        };

        self.inner.notify(Notification::info(
            EventType::TaskSubmitting,
            format!(
                "Enviando '{}' ({}) para os agentes: {}",
                document.file_name,
                format_file_size(document.size()),
                agents.join(", ")
            ),
        ));

        let response = self.inner.api.upload(document, &agents).await;

        let upload = match response {
            Ok(upload) if !upload.task_id.trim().is_empty() => Ok(upload),
            Ok(_) => Err(AnalysisError::Submission(
                "Resposta do serviço sem identificador de tarefa".to_string(),
            )),
            Err(ApiError::Rejected { status, detail }) => {
                log::warn!("[LIFECYCLE] Upload rejected with HTTP {}", status);
                Err(AnalysisError::Submission(
                    detail.unwrap_or_else(|| GENERIC_UPLOAD_ERROR.to_string()),
                ))
            }
            Err(err) => Err(AnalysisError::Transport(err.to_string())),
        };

        let mut machine = self.inner.machine.lock();
        match upload {
            Err(err) => {
                self.inner.transition(&mut machine, LifecycleState::Idle);
                drop(machine);
                self.inner.notify(Notification::error(
                    EventType::SubmissionRejected,
                    format!("Erro no upload: {}", err),
                ));
                Err(err)
            }
            Ok(upload) => {
                let task = Task::new(upload.task_id.clone());
                let token = CancellationToken::new();
                let join = tokio::spawn(run_poll_loop(
                    self.inner.clone(),
                    epoch,
                    task.id.clone(),
                    token.clone(),
                ));
                machine.poller = Some(PollHandle { token, join });
                self.inner.transition(&mut machine, LifecycleState::Polling { task });
                drop(machine);

                log::info!("[LIFECYCLE] Task {} accepted", upload.task_id);
                self.inner.notify(
                    Notification::success(
                        EventType::TaskSubmitted,
                        format!("Upload realizado com sucesso! ID: {}", upload.task_id),
                    )
                    .with_task(upload.task_id.clone()),
                );
                Ok(upload.task_id)
            }
        }
    }

    /// Read a document from disk and submit it.
    ///
    /// The size limit is checked against file metadata before reading.
    pub async fn submit_path(&self, path: &Path, agent_keys: &[String]) -> Result<String, AnalysisError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let size = tokio::fs::metadata(path).await?.len();

        if let Err(err) = validate_submission(&self.inner.config, &file_name, size, agent_keys) {
            self.inner
                .notify(Notification::error(EventType::SubmissionRejected, err.to_string()));
            return Err(err);
        }

        let bytes = tokio::fs::read(path).await?;
        self.submit(DocumentUpload::new(file_name, bytes), agent_keys).await
    }

    /// Stop polling the live task. The service is not notified.
    pub fn cancel(&self) -> Result<(), AnalysisError> {
        let mut machine = self.inner.machine.lock();
        let task = match &machine.state {
            LifecycleState::Polling { task } => task.clone(),
            other => {
                let err = AnalysisError::Conflict(format!(
                    "Nenhuma análise em andamento para cancelar (estado: {})",
                    other
                ));
                drop(machine);
                self.inner
                    .notify(Notification::warning(EventType::InvalidOperation, err.to_string()));
                return Err(err);
            }
        };

        machine.stop_poller();
        let id = task.id.clone();
        self.inner.transition(&mut machine, LifecycleState::Cancelled { task });
        drop(machine);

        self.inner
            .notify(Notification::warning(EventType::TaskCancelled, "Análise cancelada").with_task(id));
        Ok(())
    }

    /// Return to `Idle`, forgetting the task
    pub fn reset(&self) -> Result<(), AnalysisError> {
        let mut machine = self.inner.machine.lock();
        if machine.state.is_busy() {
            let err = AnalysisError::Conflict(format!(
                "Não é possível reiniciar durante a análise (estado: {})",
                machine.state
            ));
            drop(machine);
            self.inner
                .notify(Notification::warning(EventType::InvalidOperation, err.to_string()));
            return Err(err);
        }
        if matches!(machine.state, LifecycleState::Idle) {
            return Ok(());
        }

        machine.stop_poller();
        self.inner.transition(&mut machine, LifecycleState::Idle);
        drop(machine);

        self.inner.notify(Notification::info(EventType::TaskReset, "Pronto para nova análise"));
        Ok(())
    }

    /// Wait until no submission or poll loop is in progress and return that state
    pub async fn wait_until_settled(&self) -> LifecycleState {
        let mut rx = self.subscribe();
        match rx.wait_for(|state| !state.is_busy()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Wait for the live task to finish.
    ///
    /// Returns the reports on completion and `None` when the task was cancelled.
    pub async fn wait_for_completion(&self) -> Result<Option<Vec<AgentReport>>, AnalysisError> {
        match self.wait_until_settled().await {
            LifecycleState::Completed { reports, .. } => Ok(Some(reports)),
            LifecycleState::Cancelled { .. } => Ok(None),
            LifecycleState::Failed {
                cause: FailureCause::RemoteTask,
                message,
                ..
            } => Err(AnalysisError::RemoteTask(message)),
            LifecycleState::Failed { message, .. } => Err(AnalysisError::Transport(message)),
            other => Err(AnalysisError::Conflict(format!(
                "Nenhuma análise para aguardar (estado: {})",
                other
            ))),
        }
    }

    fn completed_task_id(&self) -> Result<String, AnalysisError> {
        self.completed().map(|(task_id, _)| task_id)
    }

    fn completed(&self) -> Result<(String, Vec<AgentReport>), AnalysisError> {
        match &self.inner.machine.lock().state {
            LifecycleState::Completed { task, reports } => Ok((task.id.clone(), reports.clone())),
            other => Err(AnalysisError::Conflict(format!(
                "Resultados disponíveis apenas após a conclusão (estado: {})",
                other
            ))),
        }
    }

    /// Fetch and classify one agent's result for the completed task
    pub async fn fetch_agent_result(&self, agent_key: &str) -> Result<AgentReport, AnalysisError> {
        let task_id = self.completed_task_id()?;
        let response = self.inner.api.fetch_agent_result(&task_id, agent_key).await?;
        Ok(AgentReport {
            key: agent_key.to_string(),
            display_name: results::types::agent_display_name(agent_key).to_string(),
            result: AgentResult::classify(&response.result),
        })
    }

    /// Save one agent's document for the completed task into `dest_dir`
    pub async fn download_agent_document(&self, agent_key: &str, dest_dir: &Path) -> Result<PathBuf, AnalysisError> {
        let task_id = self.completed_task_id()?;
        download::save_agent_document(self.inner.api.as_ref(), self.inner.sink.as_ref(), &task_id, agent_key, dest_dir)
            .await
    }

    /// Save the combined document for the completed task into `dest_dir`
    pub async fn download_combined_document(&self, dest_dir: &Path) -> Result<PathBuf, AnalysisError> {
        let task_id = self.completed_task_id()?;
        download::save_combined_document(self.inner.api.as_ref(), self.inner.sink.as_ref(), &task_id, dest_dir).await
    }

    /// Save the combined document and the document of every agent that did not fail.
    ///
    /// A failed download does not stop the others; failures are collected in the summary.
    pub async fn download_all(&self, dest_dir: &Path) -> Result<DownloadSummary, AnalysisError> {
        let (task_id, reports) = self.completed()?;
        let api = self.inner.api.as_ref();
        let sink = self.inner.sink.as_ref();
        let mut summary = DownloadSummary::default();

        match download::save_combined_document(api, sink, &task_id, dest_dir).await {
            Ok(path) => summary.saved.push(path),
            Err(err) => summary.failed.push((download::COMBINED_DOCUMENT.to_string(), err)),
        }
        for report in reports.iter().filter(|r| !r.result.is_error()) {
            match download::save_agent_document(api, sink, &task_id, &report.key, dest_dir).await {
                Ok(path) => summary.saved.push(path),
                Err(err) => summary.failed.push((report.key.clone(), err)),
            }
        }

        if !summary.failed.is_empty() {
            log::warn!(
                "[DOWNLOAD] {} of {} documents failed for {}",
                summary.failed.len(),
                summary.failed.len() + summary.saved.len(),
                task_id
            );
        }
        Ok(summary)
    }
}

impl Drop for TaskLifecycleClient {
    fn drop(&mut self) {
        if let Some(poller) = self.inner.machine.lock().poller.take() {
            poller.stop();
            poller.join.abort();
        }
    }
}

/// Local checks run before any upload.
///
/// Returns the trimmed, non-blank agent keys in their given order.
pub fn validate_submission(
    config: &Config,
    file_name: &str,
    size: u64,
    agent_keys: &[String],
) -> Result<Vec<String>, AnalysisError> {
    let suffix = config.accepted_suffix.to_lowercase();
    if !file_name.to_lowercase().ends_with(&suffix) {
        return Err(AnalysisError::Validation(format!(
            "Apenas arquivos {} são aceitos!",
            suffix.trim_start_matches('.').to_uppercase()
        )));
    }

    if size > config.max_upload_bytes {
        return Err(AnalysisError::Validation(format!(
            "Arquivo muito grande! Máximo {}.",
            format_file_size(config.max_upload_bytes)
        )));
    }

    let agents: Vec<String> = agent_keys
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();
    if agents.is_empty() {
        return Err(AnalysisError::Validation("Selecione pelo menos um agente!".to_string()));
    }

    Ok(agents)
}
