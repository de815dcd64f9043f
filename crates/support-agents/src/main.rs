//! Support ticket triage CLI.
//!
//! # Usage
//!
//! ```bash
//! # One ticket against the configured endpoint
//! support-agents run --subject "Charged twice" --description "Two charges this month"
//!
//! # Offline, with canned model responses
//! support-agents run --mock --subject "Charged twice" --description "..."
//!
//! # Many tickets from a JSONL file, four at a time
//! support-agents batch --input tickets.jsonl --concurrency 4
//!
//! # Probe the inference endpoint
//! support-agents check
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use support_agents::config::{check_endpoint, AgentConfig};
use support_agents::runner::{build_engine, format_result, run_batch, run_ticket};
use support_agents::telemetry::{read_run_summaries, TelemetryLog, TelemetryStats};
use tracing::info;
use triage_coordination::Ticket;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of `<category>.txt` documentation (overrides TRIAGE_KNOWLEDGE_DIR)
    #[arg(long, global = true)]
    knowledge_dir: Option<PathBuf>,

    /// CSV file for escalated tickets (overrides TRIAGE_ESCALATION_LOG)
    #[arg(long, global = true)]
    escalation_log: Option<PathBuf>,

    /// JSONL file receiving one run summary per ticket (overrides TRIAGE_TELEMETRY_LOG)
    #[arg(long, global = true)]
    telemetry_log: Option<PathBuf>,

    /// Ask the model for a rejection reason when the reviewer gives none
    #[arg(long, global = true, default_value_t = false)]
    elicit_feedback: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Triage a single ticket
    Run {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        description: String,
        /// Use canned model responses instead of the endpoint
        #[arg(long, default_value_t = false)]
        mock: bool,
        /// Print the result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Triage every ticket in a JSONL file (`{"subject": .., "description": ..}` per line)
    Batch {
        #[arg(long)]
        input: PathBuf,
        /// Tickets in flight at once (overrides the config file)
        #[arg(long)]
        concurrency: Option<usize>,
        #[arg(long, default_value_t = false)]
        mock: bool,
    },
    /// Check that the inference endpoint is reachable
    Check,
    /// Summarize a telemetry file
    Stats {
        /// Defaults to the configured telemetry log
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

impl Args {
    fn resolve_config(&self) -> Result<AgentConfig> {
        let mut config = AgentConfig::load(self.config.as_deref())?;
        if let Some(dir) = &self.knowledge_dir {
            config.knowledge_dir = dir.clone();
        }
        if let Some(path) = &self.escalation_log {
            config.escalation_log = path.clone();
        }
        if let Some(path) = &self.telemetry_log {
            config.telemetry_log = Some(path.clone());
        }
        if self.elicit_feedback {
            config.elicit_feedback = true;
        }
        if let Command::Batch {
            concurrency: Some(n),
            ..
        } = self.command
        {
            config.concurrency = n;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.resolve_config()?;

    match args.command {
        Command::Run {
            subject,
            description,
            mock,
            json,
        } => {
            let ticket = match Ticket::new(subject, description) {
                Ok(ticket) => ticket,
                Err(e) => {
                    eprintln!("{e}");
                    return Ok(ExitCode::from(2));
                }
            };
            let engine = build_engine(&config, mock)?;
            info!(model = %config.endpoint.model, mock, "Triage run starting");

            let telemetry = config.telemetry_log.as_ref().map(TelemetryLog::new);
            let result = run_ticket(&engine, ticket, telemetry.as_ref())
                .await
                .context("Triage run failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", format_result(&result));
            }
        }
        Command::Batch { input, mock, .. } => {
            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read batch input {}", input.display()))?;
            let engine = build_engine(&config, mock)?;

            let telemetry = config
                .telemetry_log
                .as_ref()
                .map(|path| Arc::new(TelemetryLog::new(path)));
            let outcomes = run_batch(&engine, &text, config.concurrency, telemetry).await;

            let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
            for outcome in &outcomes {
                println!("{}", serde_json::to_string(outcome)?);
            }
            info!(total = outcomes.len(), failed, "Batch complete");
            if failed > 0 {
                return Ok(ExitCode::from(1));
            }
        }
        Command::Check => {
            let url = &config.endpoint.url;
            if check_endpoint(&config.endpoint).await {
                println!("OK {url} ({})", config.endpoint.model);
            } else {
                println!("UNREACHABLE {url}");
                return Ok(ExitCode::from(1));
            }
        }
        Command::Stats { input } => {
            let Some(path) = input.or(config.telemetry_log) else {
                bail!("No telemetry file: pass --input or set TRIAGE_TELEMETRY_LOG");
            };
            let summaries = read_run_summaries(&path)
                .with_context(|| format!("Failed to read telemetry {}", path.display()))?;
            let stats = TelemetryStats::from_summaries(&summaries);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}
