mod config;

pub use config::TaskStateConfig;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::engine::StateBackend;
use crate::engine::types::*;
use crate::storage::StateStore;
use crate::storage::api_store::ApiStateStore;
use crate::storage::json_store::JsonStateStore;
use crate::storage::memory_store::MemoryStateStore;

const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_TIMEOUT_S: f64 = 30.0;

#[derive(Parser)]
#[command(name = "taskstate", version, about = "Remote task state backend")]
pub struct Cli {
    /// Path to a .env file to load (default: auto-detect .env in cwd)
    #[arg(long, global = true)]
    dotenv: Option<PathBuf>,

    /// Path to a YAML config file (default: taskstate.yaml in cwd)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the remote store [env: TASKSTATE_API_URL]
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a reference remote store server
    Serve {
        /// Host to bind to [env: TASKSTATE_HOST]
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on [env: TASKSTATE_PORT]
        #[arg(short, long)]
        port: Option<u16>,

        /// JSON store directory; records are kept in memory when unset [env: TASKSTATE_STORE_DIR]
        #[arg(long)]
        store_dir: Option<PathBuf>,
    },

    /// Create a job and its tasks from a YAML or JSON file
    Provision {
        /// Path to the job definition
        file: PathBuf,
    },

    /// Show the state of a task
    Get {
        /// Task ID
        task_id: String,
    },

    /// Record a new state for a task
    Set {
        /// Task ID
        task_id: String,

        /// Target state (pending, received, started, success, failure, retry)
        status: TaskStatus,

        /// Result value as JSON; repeat for multiple results (success only)
        #[arg(long = "result")]
        results: Vec<String>,

        /// Error message (failure only)
        #[arg(long)]
        error: Option<String>,
    },

    /// Check whether a group has finished
    GroupStatus {
        /// Group (job) ID
        group_id: String,

        /// Number of tasks the group is expected to contain
        #[arg(short, long)]
        count: usize,
    },

    /// List the per-task states of a group
    GroupTasks {
        /// Group (job) ID
        group_id: String,

        /// Number of tasks the group is expected to contain (informational;
        /// every member the store reports is listed)
        #[arg(short, long, default_value_t = 0)]
        count: usize,

        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Load .env before resolving env-backed settings
    load_dotenv(cli.dotenv.as_deref());

    let config = TaskStateConfig::load(cli.config.as_deref())?;

    let api_url = cli.api_url;
    let backend = || remote_backend(api_url.clone(), &config);

    match cli.command {
        Commands::Serve {
            host,
            port,
            store_dir,
        } => cmd_serve(host, port, store_dir, &config).await,
        Commands::Provision { file } => cmd_provision(&backend()?, &file).await,
        Commands::Get { task_id } => cmd_get(&backend()?, &task_id).await,
        Commands::Set {
            task_id,
            status,
            results,
            error,
        } => cmd_set(&backend()?, &task_id, status, results, error).await,
        Commands::GroupStatus { group_id, count } => {
            cmd_group_status(&backend()?, &group_id, count).await
        }
        Commands::GroupTasks {
            group_id,
            count,
            format,
        } => cmd_group_tasks(&backend()?, &group_id, count, &format).await,
    }
}

/// Load environment variables from a .env file.
/// If an explicit path is given, load from that path (warn if missing).
/// Otherwise, auto-detect .env in the current working directory (silently skip if absent).
fn load_dotenv(explicit_path: Option<&Path>) {
    match explicit_path {
        Some(path) => match dotenvy::from_path(path) {
            Ok(()) => info!("Loaded env from {}", path.display()),
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load dotenv file '{}': {}",
                    path.display(),
                    e
                );
            }
        },
        None => match dotenvy::dotenv() {
            Ok(path) => info!("Loaded env from {}", path.display()),
            Err(dotenvy::Error::Io(_)) => {}
            Err(e) => {
                eprintln!("Warning: Failed to parse .env file: {}", e);
            }
        },
    }
}

/// Pick a setting: explicit flag, then environment, then config file.
fn resolve(flag: Option<String>, env_key: &str, config: Option<&str>) -> Option<String> {
    flag.or_else(|| std::env::var(env_key).ok().filter(|v| !v.is_empty()))
        .or_else(|| config.map(str::to_string))
}

fn remote_backend(api_url: Option<String>, config: &TaskStateConfig) -> Result<StateBackend> {
    let api_url = resolve(api_url, "TASKSTATE_API_URL", config.api_url.as_deref())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let timeout_s = match std::env::var("TASKSTATE_TIMEOUT_S") {
        Ok(v) => v
            .parse::<f64>()
            .with_context(|| format!("Invalid TASKSTATE_TIMEOUT_S: {}", v))?,
        Err(_) => config.timeout_s.unwrap_or(DEFAULT_TIMEOUT_S),
    };
    if !timeout_s.is_finite() || timeout_s <= 0.0 {
        anyhow::bail!("Timeout must be a positive number of seconds, got {}", timeout_s);
    }

    let store = ApiStateStore::with_timeout(&api_url, Duration::from_secs_f64(timeout_s))
        .context("Failed to build HTTP client")?;
    info!(api_url = %store.base_url(), timeout_s, "Using remote store");

    Ok(StateBackend::new(Arc::new(store)))
}

async fn cmd_serve(
    host: Option<String>,
    port: Option<u16>,
    store_dir: Option<PathBuf>,
    config: &TaskStateConfig,
) -> Result<()> {
    let host = resolve(host, "TASKSTATE_HOST", config.host.as_deref())
        .unwrap_or_else(|| "0.0.0.0".to_string());

    let port = match port {
        Some(p) => p,
        None => match std::env::var("TASKSTATE_PORT") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("Invalid TASKSTATE_PORT: {}", v))?,
            Err(_) => config.port.unwrap_or(3000),
        },
    };

    let store_dir = resolve(
        store_dir.map(|p| p.to_string_lossy().to_string()),
        "TASKSTATE_STORE_DIR",
        config.store_dir.as_deref(),
    );

    let store: Arc<dyn StateStore> = match store_dir {
        Some(dir) => {
            info!(store_dir = %dir, "Using JSON store");
            Arc::new(JsonStateStore::new(dir))
        }
        None => {
            info!("Using in-memory store");
            Arc::new(MemoryStateStore::new())
        }
    };

    crate::api::serve(&host, port, store).await
}

async fn cmd_provision(backend: &StateBackend, file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read job file: {}", file.display()))?;

    let group: Group = match file.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse job file: {}", file.display()))?,
        _ => serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse job file: {}", file.display()))?,
    };

    let group = backend.store().provision_group(&group).await?;

    println!("Job: {} [{}] ({} tasks)", group.id, group.kind, group.tasks.len());
    for task in &group.tasks {
        println!("  {:>3}  {}  {}", task.sequence_index, task.id, task.name);
    }

    Ok(())
}

async fn cmd_get(backend: &StateBackend, task_id: &str) -> Result<()> {
    let state = backend
        .get_state(task_id)
        .await
        .with_context(|| format!("Failed to get state of task '{}'", task_id))?;

    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

async fn cmd_set(
    backend: &StateBackend,
    task_id: &str,
    status: TaskStatus,
    results: Vec<String>,
    error: Option<String>,
) -> Result<()> {
    let results = if results.is_empty() {
        None
    } else {
        Some(results.iter().map(String::as_str).map(parse_result).collect())
    };

    backend
        .set_state(task_id, status, results, error)
        .await
        .with_context(|| format!("Failed to set state of task '{}'", task_id))?;

    println!("Task {} → {}", task_id, status);
    Ok(())
}

async fn cmd_group_status(backend: &StateBackend, group_id: &str, count: usize) -> Result<()> {
    let complete = backend
        .is_group_complete(group_id, count)
        .await
        .with_context(|| format!("Failed to check group '{}'", group_id))?;

    println!("Group {}: {}", group_id, if complete { "complete" } else { "incomplete" });
    Ok(())
}

async fn cmd_group_tasks(
    backend: &StateBackend,
    group_id: &str,
    expected_count: usize,
    format: &str,
) -> Result<()> {
    let states = backend
        .list_task_states(group_id, expected_count)
        .await
        .with_context(|| format!("Failed to list tasks of group '{}'", group_id))?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&states)?);
        return Ok(());
    }

    println!("{:<38} {:<10} DETAIL", "TASK ID", "STATE");
    println!("{}", "-".repeat(72));

    for state in &states {
        let detail = match state.state {
            TaskStatus::Failure => state.error.clone(),
            TaskStatus::Success => format!("{} result(s)", state.results.len()),
            _ => String::new(),
        };
        println!("{:<38} {:<10} {}", state.task_id, state.state, detail);
    }

    println!("\nTotal: {} task(s)", states.len());
    Ok(())
}

/// Parse a `--result` argument.
///
/// Accepts a full `{"Type": ..., "Value": ...}` object, otherwise any JSON
/// value (or bare text) with its type inferred.
fn parse_result(raw: &str) -> TaskResult {
    if let Ok(result) = serde_json::from_str::<TaskResult>(raw) {
        return result;
    }

    let value = serde_json::from_str::<serde_json::Value>(raw)
        .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));

    let kind = match &value {
        serde_json::Value::String(_) => "string",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => "int64",
        serde_json::Value::Number(_) => "float64",
        serde_json::Value::Null => "null",
        _ => "json",
    };

    TaskResult::new(kind, value)
}
