//! huginn: optimizer demo
//!
//! Reads `<session> <command...>` lines from stdin, runs them concurrently
//! through an [`Optimizer`](huginn::Optimizer) backed by an echo executor
//! and prints each response as a JSON line.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{info, warn};

use huginn::{CancellationToken, CommandExecutor, FileConfig, Optimizer, OptimizerConfig};

/// Huginn request optimizer demo
#[derive(Parser)]
#[command(name = "huginn")]
#[command(version = huginn::PKG_VERSION)]
#[command(about = "Run stdin commands through the huginn optimizer")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Simulated executor latency in milliseconds.
    #[arg(long, env = "HUGINN_DELAY_MS", default_value_t = 50)]
    delay_ms: u64,

    /// Print the metrics snapshot to stderr when done.
    #[arg(long)]
    stats: bool,
}

/// Echoes its input after a fixed delay.
struct EchoExecutor {
    delay: Duration,
}

#[async_trait]
impl CommandExecutor for EchoExecutor {
    async fn execute(&self, session_id: &str, command: &str) -> huginn::Result<Value> {
        tokio::time::sleep(self.delay).await;
        Ok(json!({
            "session": session_id,
            "command": command,
            "type": huginn::types::command_type(command),
            "target": huginn::types::command_target(command),
        }))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout stays one JSON object per line.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config: OptimizerConfig = FileConfig::load(args.config.as_deref())?.into();

    let executor = Arc::new(EchoExecutor {
        delay: Duration::from_millis(args.delay_ms),
    });
    let optimizer = Arc::new(Optimizer::builder(executor).config(config).build()?);
    info!(version = huginn::version_string(), workers = optimizer.workers(), "huginn starting");

    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let Some((session, command)) = line.trim().split_once(char::is_whitespace) else {
            if !line.trim().is_empty() {
                warn!(line = %line, "expected `<session> <command...>`");
            }
            continue;
        };
        let (session, command) = (session.to_string(), command.trim().to_string());
        let optimizer = Arc::clone(&optimizer);
        let cancel = cancel.clone();

        tasks.spawn(async move {
            let line = match optimizer.execute(&cancel, &session, &command).await {
                Ok(response) => json!({ "session": session, "command": command, "response": response }),
                Err(e) => json!({ "session": session, "command": command, "error": e.to_string() }),
            };
            println!("{line}");
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "request task failed");
        }
    }

    if args.stats {
        eprintln!("{}", serde_json::to_string_pretty(&optimizer.snapshot())?);
    }
    Ok(())
}
