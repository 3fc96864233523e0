use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use docket_analyzer::api::{AnalysisApi, HttpAnalysisApi};
use docket_analyzer::config::Config;
use docket_analyzer::download;
use docket_analyzer::lifecycle::{TaskLifecycleClient, TaskStatus, UNKNOWN_TASK_ERROR};
use docket_analyzer::notify::{ChannelSink, Notification};
use docket_analyzer::results::{self, formatter, types::builtin_catalog, AgentReport, AgentResult};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Debug, Parser)]
#[command(name = "docket-analyzer", about = "Submit legal documents for multi-agent analysis")]
struct Cli {
    /// Base URL of the analysis API, e.g. http://localhost:8000/api/v1
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,
    /// Where downloaded documents are written
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a document and follow its analysis until it finishes
    Analyze(AnalyzeArgs),
    /// List the agents offered by the service
    Agents,
    /// List tasks known to the service
    Tasks,
    /// Delete a task on the service
    Delete { task_id: String },
    /// Show the results of a finished task
    Result(TaskArgs),
    /// Save the rendered document of a finished task
    Download(TaskArgs),
    /// Check that the service is up
    Health,
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    #[arg(value_name = "FILE")]
    file: PathBuf,
    /// Comma-separated agent keys
    #[arg(long, value_delimiter = ',', required = true)]
    agents: Vec<String>,
    /// Save the combined and per-agent documents once the analysis completes
    #[arg(long)]
    download: bool,
}

#[derive(Debug, Args)]
struct TaskArgs {
    task_id: String,
    /// Restrict to one agent
    #[arg(long)]
    agent: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(url) = cli.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(ms) = cli.poll_interval_ms {
        config.poll_interval = Duration::from_millis(ms.max(1));
    }
    if let Some(dir) = cli.output_dir {
        config.download_dir = dir;
    }
    log::info!("Using analysis API at {}", config.api_base_url);

    let api = Arc::new(HttpAnalysisApi::new(&config)?);

    match cli.command {
        Command::Analyze(args) => analyze(api, config, args).await,
        Command::Agents => list_agents(api.as_ref()).await,
        Command::Tasks => list_tasks(api.as_ref()).await,
        Command::Delete { task_id } => {
            let message = api.delete_task(&task_id).await?;
            println!("{}", message);
            Ok(())
        }
        Command::Result(args) => show_result(api.as_ref(), args).await,
        Command::Download(args) => download_documents(api.as_ref(), &config, args).await,
        Command::Health => {
            let health = api.health().await?;
            println!(
                "{} {} {}",
                health.status,
                health.service.unwrap_or_default(),
                health.version.unwrap_or_default()
            );
            Ok(())
        }
    }
}

fn print_notification(notification: &Notification) {
    eprintln!("{}", notification);
}

fn drain(notifications: &mut UnboundedReceiver<Notification>) {
    while let Ok(notification) = notifications.try_recv() {
        print_notification(&notification);
    }
}

async fn analyze(api: Arc<HttpAnalysisApi>, config: Config, args: AnalyzeArgs) -> Result<()> {
    let (sink, mut notifications) = ChannelSink::new();
    let download_dir = config.download_dir.clone();
    let client = TaskLifecycleClient::new(api, Arc::new(sink), config);

    let submitted = client.submit_path(&args.file, &args.agents).await;
    drain(&mut notifications);
    let task_id = submitted.with_context(|| format!("Failed to submit {}", args.file.display()))?;
    println!("Task {}", task_id);

    let outcome = loop {
        tokio::select! {
            Some(notification) = notifications.recv() => print_notification(&notification),
            outcome = client.wait_for_completion() => break outcome,
            _ = tokio::signal::ctrl_c() => {
                if let Err(err) = client.cancel() {
                    log::warn!("Cancel ignored: {}", err);
                }
            }
        }
    };
    drain(&mut notifications);

    let Some(reports) = outcome? else {
        return Ok(());
    };
    print!("{}", formatter::render_text(&reports));

    if args.download {
        let summary = client.download_all(&download_dir).await;
        drain(&mut notifications);

        let summary = summary?;
        for path in &summary.saved {
            println!("{}", path.display());
        }
        if !summary.is_complete() {
            let failed: Vec<&str> = summary.failed.iter().map(|(label, _)| label.as_str()).collect();
            bail!("{} document(s) could not be saved: {}", failed.len(), failed.join(", "));
        }
    }
    Ok(())
}

async fn list_agents(api: &dyn AnalysisApi) -> Result<()> {
    let agents = match api.list_agents().await {
        Ok(agents) => agents,
        Err(err) => {
            log::warn!("Could not load agents from the service ({}); showing built-in list", err);
            builtin_catalog()
        }
    };

    for agent in results::order_catalog(agents) {
        println!("{:<10} {}", agent.key, agent.name);
        if !agent.description.is_empty() {
            println!("{:<10} {}", "", agent.description);
        }
    }
    Ok(())
}

async fn list_tasks(api: &dyn AnalysisApi) -> Result<()> {
    let tasks = api.list_tasks().await?;
    if tasks.is_empty() {
        println!("Nenhuma tarefa encontrada");
        return Ok(());
    }
    for task in tasks {
        println!("{}  {:<10} {:>3}%", task.task_id, task.status, task.progress);
    }
    Ok(())
}

async fn show_result(api: &dyn AnalysisApi, args: TaskArgs) -> Result<()> {
    if let Some(agent_key) = args.agent {
        let response = api.fetch_agent_result(&args.task_id, &agent_key).await?;
        let report = AgentReport {
            display_name: results::types::agent_display_name(&agent_key).to_string(),
            result: AgentResult::classify(&response.result),
            key: agent_key,
        };
        print!("{}", formatter::render_card(&report));
        return Ok(());
    }

    let response = api.fetch_results(&args.task_id).await?;
    match response.status {
        Some(TaskStatus::Error) => bail!(
            "Erro na análise: {}",
            response.error.unwrap_or_else(|| UNKNOWN_TASK_ERROR.to_string())
        ),
        Some(status) if status.is_active() => bail!("Task {} is still {}", args.task_id, status),
        _ => {
            let reports = results::aggregate(response.results.as_ref());
            print!("{}", formatter::render_text(&reports));
            Ok(())
        }
    }
}

async fn download_documents(api: &dyn AnalysisApi, config: &Config, args: TaskArgs) -> Result<()> {
    let (sink, mut notifications) = ChannelSink::new();
    let saved = match &args.agent {
        Some(agent_key) => {
            download::save_agent_document(api, &sink, &args.task_id, agent_key, &config.download_dir).await
        }
        None => download::save_combined_document(api, &sink, &args.task_id, &config.download_dir).await,
    };
    drain(&mut notifications);

    let path = saved?;
    println!("{}", path.display());
    Ok(())
}
