//! Tasklane CLI - worker, producer and status tooling.
//!
//! AWS コマンドは AWS_REGION / QUEUE_URL / DYNAMO_TABLE などを環境変数
//! （または .env）から読みます。`demo` は外部サービスなしで動きます。

mod output;

#[cfg(feature = "aws")]
use clap::ArgGroup;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use tasklane_core::app::{IntakeConfig, WorkerPoolConfig};
use tasklane_core::domain::task_type::{IMAGE_RESIZE, PROCESS_DATA, SEND_EMAIL};
use tasklane_core::impls::{InMemoryStatusStore, InMemoryTransport, InMemoryTransportConfig};
use tasklane_core::{AppBuilder, Priority, TaskId, TaskType};

#[derive(Parser)]
#[command(name = "tasklane", about = "Queue-driven task processing pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the whole pipeline in memory with a few sample tasks
    Demo {
        /// Skip the simulated handler latency
        #[arg(long)]
        fast: bool,
        /// Number of workers
        #[arg(long, default_value = "2")]
        workers: usize,
    },
    /// Consume the SQS queue until Ctrl-C
    #[cfg(feature = "aws")]
    Worker,
    /// Submit one task to the SQS queue
    #[cfg(feature = "aws")]
    Submit {
        /// Task type
        #[arg(long = "type", value_parser = [IMAGE_RESIZE, SEND_EMAIL, PROCESS_DATA])]
        task_type: String,
        /// Payload; parsed as JSON, otherwise sent as a plain string
        #[arg(long)]
        data: String,
        /// LOW, NORMAL or HIGH
        #[arg(long, default_value = "NORMAL")]
        priority: Priority,
    },
    /// Show task status from the status table
    #[cfg(feature = "aws")]
    #[command(group(ArgGroup::new("target").required(true).args(["task_id", "list"])))]
    Status {
        /// Look up a single task
        #[arg(long)]
        task_id: Option<String>,
        /// List recent tasks
        #[arg(long)]
        list: bool,
        /// Maximum number of items to scan
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// JSON if it parses, otherwise the raw string (file keys, addresses).
#[cfg(feature = "aws")]
fn parse_data(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo { fast, workers } => run_demo(!fast, workers).await?,
        #[cfg(feature = "aws")]
        Commands::Worker => aws_cmd::run_worker().await?,
        #[cfg(feature = "aws")]
        Commands::Submit {
            task_type,
            data,
            priority,
        } => aws_cmd::submit(TaskType::new(task_type), parse_data(&data), priority).await?,
        #[cfg(feature = "aws")]
        Commands::Status {
            task_id,
            list,
            limit,
        } => {
            let target = match task_id {
                Some(task_id) if !list => aws_cmd::StatusTarget::Task(task_id),
                _ => aws_cmd::StatusTarget::Recent { limit },
            };
            aws_cmd::status(target).await?
        }
    }
    Ok(())
}

async fn run_demo(simulate_latency: bool, workers: usize) -> anyhow::Result<()> {
    let transport = Arc::new(InMemoryTransport::new(InMemoryTransportConfig {
        visibility_timeout: Duration::from_millis(500),
        max_receive_count: Some(3),
    }));
    let store = Arc::new(InMemoryStatusStore::new());

    let app = AppBuilder::new()
        .with_builtin_handlers(simulate_latency)?
        .expect_tasks(&[IMAGE_RESIZE, SEND_EMAIL, PROCESS_DATA])
        .store(store)
        .transport(transport.clone())
        .intake_config(IntakeConfig::default())
        .build()?;

    let samples = [
        (TaskType::image_resize(), json!("photos/cat.jpg"), Priority::Normal),
        (TaskType::send_email(), json!("user@example.com"), Priority::High),
        (TaskType::process_data(), json!({"records": 1000}), Priority::Low),
        (TaskType::new("UNKNOWN_TYPE"), json!("x"), Priority::Normal),
    ];
    let mut submitted: Vec<TaskId> = Vec::with_capacity(samples.len());
    for (task_type, data, priority) in samples {
        let task_id = app.submitter().submit(task_type, data, priority).await?;
        println!("submitted {task_id}");
        submitted.push(task_id);
    }

    let pool = app.spawn_workers(WorkerPoolConfig {
        workers,
        poll_interval: Duration::from_millis(100),
    });

    // UNKNOWN_TYPE は再配送を経て dead-letter されるまで残る
    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    while !transport.is_empty().await {
        if tokio::time::Instant::now() >= deadline {
            tracing::warn!("demo timed out waiting for the queue to drain");
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    pool.shutdown_and_join().await;

    println!();
    for task_id in &submitted {
        match app.status().get(task_id).await? {
            Some(record) => output::print_record(&record),
            None => println!("? {task_id}  (no status)"),
        }
    }
    let dead = transport.dead_letters().await;
    if !dead.is_empty() {
        println!("\n{} message(s) dead-lettered", dead.len());
    }
    Ok(())
}

#[cfg(feature = "aws")]
mod aws_cmd {
    use super::*;
    use anyhow::Context;
    use serde_json::Value;
    use tasklane_core::WorkerConfig;
    use tasklane_core::app::{StatusQuery, Submitter};
    use tasklane_core::aws::{DynamoDbStatusStore, SqsTransport, load_sdk_config};
    use tasklane_core::ports::{SystemClock, UlidGenerator};

    pub async fn run_worker() -> anyhow::Result<()> {
        let config = WorkerConfig::from_env().context("Failed to load worker configuration")?;
        let queue_url = config.require_queue_url()?;
        let sdk = load_sdk_config(config.region.clone()).await;

        let app = AppBuilder::new()
            .with_builtin_handlers(true)?
            .expect_tasks(&[IMAGE_RESIZE, SEND_EMAIL, PROCESS_DATA])
            .store(Arc::new(DynamoDbStatusStore::from_sdk_config(
                &sdk,
                &config.table_name,
            )))
            .transport(Arc::new(SqsTransport::from_sdk_config(
                &sdk,
                queue_url,
                config.wait_time_secs,
            )))
            .intake_config(config.intake())
            .build()?;

        tracing::info!(
            queue_url,
            table = %config.table_name,
            region = %config.region,
            task_types = ?app.registry().registered_types(),
            "worker starting"
        );
        let pool = app.spawn_workers(config.worker_pool());

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        tracing::info!("shutdown requested; finishing in-flight batches");
        pool.shutdown_and_join().await;
        Ok(())
    }

    pub async fn submit(task_type: TaskType, data: Value, priority: Priority) -> anyhow::Result<()> {
        let config = WorkerConfig::from_env().context("Failed to load configuration")?;
        let queue_url = config.require_queue_url()?;
        let sdk = load_sdk_config(config.region.clone()).await;

        let submitter = Submitter::new(
            Arc::new(SqsTransport::from_sdk_config(&sdk, queue_url, 0)),
            Arc::new(UlidGenerator::new(SystemClock)),
        );
        let task_id = submitter
            .submit(task_type, data, priority)
            .await
            .context("Failed to submit task")?;
        println!("{task_id}");
        Ok(())
    }

    /// `--task-id` or `--list`; clap requires exactly one.
    pub enum StatusTarget {
        Task(String),
        Recent { limit: usize },
    }

    pub async fn status(target: StatusTarget) -> anyhow::Result<()> {
        let config = WorkerConfig::from_env().context("Failed to load configuration")?;
        let sdk = load_sdk_config(config.region.clone()).await;
        let query = StatusQuery::new(Arc::new(DynamoDbStatusStore::from_sdk_config(
            &sdk,
            &config.table_name,
        )));

        match target {
            StatusTarget::Task(raw) => {
                let task_id = TaskId::new(raw).context("task id must not be empty")?;
                match query.get(&task_id).await? {
                    Some(record) => output::print_record(&record),
                    None => println!("task {task_id} not found"),
                }
            }
            StatusTarget::Recent { limit } => {
                let records = query.list_recent(limit).await?;
                output::print_records(&records);
                output::print_counts(&query.counts(limit).await?);
            }
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "aws"))]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn status_requires_task_id_or_list() {
        assert!(Cli::try_parse_from(["tasklane", "status"]).is_err());
        assert!(
            Cli::try_parse_from(["tasklane", "status", "--task-id", "t-1", "--list"]).is_err()
        );

        let cli = Cli::try_parse_from(["tasklane", "status", "--list", "--limit", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Status { task_id: None, list: true, limit: 5 }
        ));
        let cli = Cli::try_parse_from(["tasklane", "status", "--task-id", "t-1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Status { task_id: Some(ref id), list: false, .. } if id == "t-1"
        ));
    }

    #[test]
    fn data_falls_back_to_plain_string() {
        assert_eq!(parse_data("photos/cat.jpg"), json!("photos/cat.jpg"));
        assert_eq!(parse_data(r#"{"records": 5}"#), json!({"records": 5}));
        assert_eq!(parse_data("\"quoted\""), json!("quoted"));
    }
}
