//! Engine wiring and ticket execution for the CLI.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use triage_coordination::{
    CsvEscalationSink, DirectoryKnowledgeBase, EngineConfig, EngineError, KnowledgeLookup,
    StaticKnowledgeBase, Ticket, TicketResult, WorkflowEngine,
};

use crate::agents;
use crate::config::AgentConfig;
use crate::telemetry::{RunSummary, TelemetryLog};

/// Build an engine from configuration.
///
/// Mock runs fall back to the built-in articles when the knowledge
/// directory does not exist, so `--mock` works from any directory.
pub fn build_engine(config: &AgentConfig, mock: bool) -> Result<WorkflowEngine> {
    let completion = agents::build_completion(config, mock)?;

    let knowledge: Arc<dyn KnowledgeLookup> = if config.knowledge_dir.is_dir() {
        Arc::new(DirectoryKnowledgeBase::new(&config.knowledge_dir))
    } else if mock {
        info!(
            dir = %config.knowledge_dir.display(),
            "Knowledge directory missing, using built-in articles"
        );
        Arc::new(StaticKnowledgeBase::builtin())
    } else {
        warn!(
            dir = %config.knowledge_dir.display(),
            "Knowledge directory missing, every category will use the no-documentation context"
        );
        Arc::new(DirectoryKnowledgeBase::new(&config.knowledge_dir))
    };

    let sink = Arc::new(CsvEscalationSink::new(&config.escalation_log));

    Ok(WorkflowEngine::new(completion, knowledge, sink).with_config(EngineConfig {
        elicit_feedback: config.elicit_feedback,
    }))
}

/// Run one ticket, appending its summary to `telemetry` when set.
pub async fn run_ticket(
    engine: &WorkflowEngine,
    ticket: Ticket,
    telemetry: Option<&TelemetryLog>,
) -> Result<TicketResult, EngineError> {
    let run = engine.run_traced(ticket).await?;
    if let Some(log) = telemetry {
        log.append(&RunSummary::from_run(&run));
    }
    Ok(run.result)
}

/// Human-readable rendering of a result.
pub fn format_result(result: &TicketResult) -> String {
    let mut out = format!(
        "**Category**: {}\n\n**Output**:\n{}",
        result.category, result.output
    );
    if !result.approved {
        if let Some(feedback) = &result.feedback {
            out.push_str(&format!("\n\n**Feedback**: {feedback}"));
        }
    }
    out
}

/// One line of batch input.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketInput {
    pub subject: String,
    pub description: String,
}

/// One line of batch output.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    /// 1-based line number in the input file.
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TicketResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchOutcome {
    fn failed(line: usize, subject: Option<String>, error: impl Into<String>) -> Self {
        Self {
            line,
            subject,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Parse a JSONL batch into validated tickets. Blank lines are skipped;
/// malformed or invalid lines become failed outcomes.
pub fn parse_batch(input: &str) -> (Vec<(usize, Ticket)>, Vec<BatchOutcome>) {
    let mut tickets = Vec::new();
    let mut rejected = Vec::new();

    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let parsed: TicketInput = match serde_json::from_str(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(line = line_no, "Skipping malformed batch line: {e}");
                rejected.push(BatchOutcome::failed(line_no, None, format!("invalid JSON: {e}")));
                continue;
            }
        };
        match Ticket::new(parsed.subject.clone(), parsed.description) {
            Ok(ticket) => tickets.push((line_no, ticket)),
            Err(e) => {
                warn!(line = line_no, "Skipping invalid ticket: {e}");
                rejected.push(BatchOutcome::failed(line_no, Some(parsed.subject), e.to_string()));
            }
        }
    }

    (tickets, rejected)
}

/// Run a JSONL batch with at most `concurrency` tickets in flight, all
/// appending to the same telemetry log. Outcomes come back in input order.
pub async fn run_batch(
    engine: &WorkflowEngine,
    input: &str,
    concurrency: usize,
    telemetry: Option<Arc<TelemetryLog>>,
) -> Vec<BatchOutcome> {
    let (tickets, mut outcomes) = parse_batch(input);
    info!(
        tickets = tickets.len(),
        rejected = outcomes.len(),
        concurrency,
        "Starting batch"
    );

    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut join_set: JoinSet<BatchOutcome> = JoinSet::new();

    for (line, ticket) in tickets {
        let sem = sem.clone();
        let engine = engine.clone();
        let telemetry = telemetry.clone();
        join_set.spawn(async move {
            let subject = Some(ticket.subject().to_string());
            let _permit = match sem.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => return BatchOutcome::failed(line, subject, e.to_string()),
            };
            match run_ticket(&engine, ticket, telemetry.as_deref()).await {
                Ok(result) => BatchOutcome {
                    line,
                    subject,
                    result: Some(result),
                    error: None,
                },
                Err(e) => BatchOutcome::failed(line, subject, format!("[{}] {e}", e.code())),
            }
        });
    }

    while let Some(res) = join_set.join_next().await {
        match res {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => warn!("Batch task panicked: {e}"),
        }
    }

    outcomes.sort_by_key(|o| o.line);
    outcomes
}
