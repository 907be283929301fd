//! Agent Triage - command line host
//!
//! Loads a TOML configuration, assembles the pipeline once and runs each message
//! through it as an independent concurrent request.

use agent_triage::bootstrap::build_pipeline;
use agent_triage::config::{ConfigError, TriageConfig};
use agent_triage::error::ErrorDetails;
use agent_triage::observability::{init_logging, LogSettings};
use agent_triage::pipeline::Pipeline;
use agent_triage::protocol::{Request, Response};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["triage.toml", "config/triage.toml"];

/// Intent triage pipeline
#[derive(Parser)]
#[command(name = "agent-triage")]
#[command(about = "Classify requests and route them to specialized agents")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "TRIAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route messages through the pipeline and print each response as JSON
    Route {
        /// Thread id shared by every message (default: a new id per message)
        #[arg(long)]
        thread: Option<String>,

        /// Messages to route; read from stdin, one per line, when omitted
        messages: Vec<String>,
    },
    /// Validate configuration
    Config {
        /// Show the parsed configuration
        #[arg(long)]
        show: bool,
    },
}

/// One line of output
#[derive(Serialize)]
#[serde(untagged)]
enum RouteOutput {
    Response(Response),
    Failure {
        thread_id: String,
        error: ErrorDetails,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(LogSettings::from_env().with_verbosity(cli.verbose));

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Route { thread, messages } => route_messages(&config, thread, messages).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            error!("Command failed: {}", e);
            process::exit(1);
        }
    }
}

fn load_configuration(config_path: Option<&Path>) -> Result<TriageConfig, ConfigError> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return TriageConfig::load_from_file(path);
    }

    for path_str in DEFAULT_CONFIG_PATHS {
        let path = Path::new(path_str);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return TriageConfig::load_from_file(path);
        }
    }

    Err(ConfigError::InvalidConfig(format!(
        "No configuration file found. Provide one with -c/--config or create {}",
        DEFAULT_CONFIG_PATHS[0]
    )))
}

/// Returns whether every request succeeded
async fn route_messages(
    config: &TriageConfig,
    thread: Option<String>,
    messages: Vec<String>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let pipeline = build_pipeline(config)?;

    let messages = if messages.is_empty() {
        read_stdin_lines().await?
    } else {
        messages
    };
    if messages.is_empty() {
        warn!("No messages to route");
        return Ok(true);
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight requests");
            interrupt.cancel();
        }
    });

    info!(count = messages.len(), "Routing messages");
    let mut tasks = JoinSet::new();
    for (index, message) in messages.into_iter().enumerate() {
        let thread_id = thread
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let pipeline = pipeline.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move { (index, run_one(&pipeline, thread_id, message, &cancel).await) });
    }

    let mut outputs = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        outputs.push(joined?);
    }
    outputs.sort_by_key(|(index, _)| *index);

    let mut all_succeeded = true;
    for (_, output) in &outputs {
        if matches!(output, RouteOutput::Failure { .. }) {
            all_succeeded = false;
        }
        println!("{}", serde_json::to_string(output)?);
    }

    Ok(all_succeeded)
}

async fn run_one(
    pipeline: &Pipeline,
    thread_id: String,
    message: String,
    cancel: &CancellationToken,
) -> RouteOutput {
    let mut request = Request::new(thread_id, message);
    match pipeline.invoke(&mut request, cancel).await {
        Ok(response) => RouteOutput::Response(response),
        Err(failure) => RouteOutput::Failure {
            thread_id: request.thread_id().to_string(),
            error: failure.to_error_details(),
        },
    }
}

async fn read_stdin_lines() -> std::io::Result<Vec<String>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut messages = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if !line.trim().is_empty() {
            messages.push(line);
        }
    }
    Ok(messages)
}

fn handle_config_command(
    config: &TriageConfig,
    show: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    // Building catches unknown categories and bad patterns that parsing alone does not
    build_pipeline(config)?;

    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }

    info!("Configuration validation complete");
    Ok(true)
}
