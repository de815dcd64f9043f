//! Per-run telemetry.
//!
//! Every finished ticket can be appended to a JSONL file (one
//! [`RunSummary`] per line) for offline analysis of approval and
//! escalation rates.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use triage_coordination::{AuditEntry, Category, TicketRun};

/// Summary of one ticket run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub subject: String,
    pub category: Category,
    pub approved: bool,
    pub escalated: bool,
    /// Rejections recorded before the run ended.
    pub attempts: u32,
    pub drafts: usize,
    pub feedbacks: Vec<String>,
    /// Audit entries recording a recovered fault (failed call, bad output).
    pub diagnostics: usize,
    pub audit: Vec<AuditEntry>,
    pub elapsed_ms: u64,
    pub prompt_version: String,
    pub timestamp: String,
}

impl RunSummary {
    pub fn from_run(run: &TicketRun) -> Self {
        Self {
            subject: run.state.ticket().subject().to_string(),
            category: run.result.category,
            approved: run.result.approved,
            escalated: run.escalated(),
            attempts: run.state.attempt,
            drafts: run.state.drafts().len(),
            feedbacks: run.state.feedbacks().to_vec(),
            diagnostics: run
                .state
                .log()
                .iter()
                .filter(|e| e.kind.is_diagnostic())
                .count(),
            audit: run.state.log().to_vec(),
            elapsed_ms: run.elapsed_ms,
            prompt_version: triage_coordination::prompts::PROMPT_VERSION.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Append-only JSONL telemetry file.
///
/// Each summary is rendered with its newline and written in one call under
/// an internal lock, so concurrent runs sharing a log never interleave.
pub struct TelemetryLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TelemetryLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a run summary as one JSON line.
    ///
    /// Telemetry never fails a run; problems are logged and dropped.
    pub fn append(&self, summary: &RunSummary) {
        let line = match serde_json::to_string(summary) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                warn!("Failed to serialize telemetry: {e}");
                return;
            }
        };

        let Ok(_guard) = self.lock.lock() else {
            warn!("Telemetry lock poisoned, dropping summary");
            return;
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Failed to create telemetry directory: {e}");
                return;
            }
        }
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
        {
            Ok(mut file) => {
                if let Err(e) = file.write_all(line.as_bytes()) {
                    warn!("Failed to append telemetry: {e}");
                } else {
                    debug!(path = %self.path.display(), "Appended run telemetry");
                }
            }
            Err(e) => warn!("Failed to open telemetry file: {e}"),
        }
    }
}

/// Read every summary from a JSONL telemetry file, skipping blank lines.
pub fn read_run_summaries(path: &Path) -> std::io::Result<Vec<RunSummary>> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut summaries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let summary: RunSummary = serde_json::from_str(&line)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        summaries.push(summary);
    }
    Ok(summaries)
}

/// Aggregate counts over a set of summaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryStats {
    pub runs: usize,
    pub approved: usize,
    pub escalated: usize,
    pub approval_rate: f64,
    pub average_drafts: f64,
}

impl TelemetryStats {
    pub fn from_summaries(summaries: &[RunSummary]) -> Self {
        let runs = summaries.len();
        if runs == 0 {
            return Self::default();
        }
        let approved = summaries.iter().filter(|s| s.approved).count();
        let escalated = summaries.iter().filter(|s| s.escalated).count();
        let drafts: usize = summaries.iter().map(|s| s.drafts).sum();
        Self {
            runs,
            approved,
            escalated,
            approval_rate: approved as f64 / runs as f64,
            average_drafts: drafts as f64 / runs as f64,
        }
    }
}
