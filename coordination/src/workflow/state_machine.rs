//! Ticket pipeline state machine: explicit stages and legal transition guards.
//!
//! Every run starts at `Classify` and ends at `Resolved` or `Escalated`.
//! The engine calls `advance()` between stages; each call validates the edge
//! against the pipeline graph and records it in the transition log, so a run
//! can be replayed from the log alone.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Number of rejected reviews after which a ticket goes to a human.
pub const MAX_ATTEMPTS: u32 = 3;

/// Pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Assigning a category to the ticket.
    Classify,
    /// Loading category documentation.
    Retrieve,
    /// Producing the first draft.
    Draft,
    /// Reviewer evaluates the current draft.
    Review,
    /// Regenerating the draft with reviewer feedback.
    RetryDraft,
    /// Draft approved. Terminal.
    Resolved,
    /// Retry budget exhausted, handed to a human. Terminal.
    Escalated,
}

impl Stage {
    /// Whether this is a terminal stage (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Escalated)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classify => write!(f, "Classify"),
            Self::Retrieve => write!(f, "Retrieve"),
            Self::Draft => write!(f, "Draft"),
            Self::Review => write!(f, "Review"),
            Self::RetryDraft => write!(f, "RetryDraft"),
            Self::Resolved => write!(f, "Resolved"),
            Self::Escalated => write!(f, "Escalated"),
        }
    }
}

/// Legal transitions between stages.
///
/// ```text
/// Classify → Retrieve
/// Retrieve → Draft
/// Draft → Review
/// Review → Resolved | Escalated | RetryDraft (only while attempt < MAX_ATTEMPTS)
/// RetryDraft → Review
/// ```
fn is_legal_transition(from: Stage, to: Stage, attempt: u32) -> bool {
    use Stage::*;

    match (from, to) {
        (Classify, Retrieve) | (Retrieve, Draft) | (Draft, Review) | (RetryDraft, Review) => true,
        (Review, Resolved) => true,
        (Review, Escalated) => attempt >= MAX_ATTEMPTS,
        // The retry budget is part of the graph, not a caller convention.
        (Review, RetryDraft) => attempt < MAX_ATTEMPTS,
        _ => false,
    }
}

/// A single recorded transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: Stage,
    pub to: Stage,
    /// Rejection count at the time of transition.
    pub attempt: u32,
    /// Milliseconds since the run started.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone)]
pub struct IllegalTransition {
    pub from: Stage,
    pub to: Stage,
    pub attempt: u32,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Illegal stage transition: {} → {} (attempt {})",
            self.from, self.to, self.attempt
        )
    }
}

impl std::error::Error for IllegalTransition {}

/// Tracks the current stage of one run and its transition history.
pub struct StateMachine {
    current: Stage,
    attempt: u32,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl StateMachine {
    /// Create a new state machine starting at `Classify`.
    pub fn new() -> Self {
        Self {
            current: Stage::Classify,
            attempt: 0,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Sync the rejection counter (called by the engine after each review).
    pub fn set_attempt(&mut self, attempt: u32) {
        self.attempt = attempt;
    }

    /// Attempt to advance to the next stage.
    pub fn advance(&mut self, to: Stage, reason: Option<&str>) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to, self.attempt) {
            return Err(IllegalTransition {
                from: self.current,
                to,
                attempt: self.attempt,
            });
        }

        let record = TransitionRecord {
            from: self.current,
            to,
            attempt: self.attempt,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(
            from = %self.current,
            to = %to,
            attempt = self.attempt,
            "Stage transition"
        );

        self.transitions.push(record);
        self.current = to;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Consume the machine, returning its transition log.
    pub fn into_transitions(self) -> Vec<TransitionRecord> {
        self.transitions
    }

    /// Summary string of the machine's history.
    pub fn summary(&self) -> String {
        let stages: Vec<String> = self.transitions.iter().map(|t| t.to.to_string()).collect();
        let mut summary = format!(
            "{} → {} ({}ms, {} transitions)",
            Stage::Classify,
            self.current,
            self.created_at.elapsed().as_millis(),
            self.transitions.len(),
        );
        if !stages.is_empty() {
            summary.push_str(&format!(" [{}]", stages.join(" → ")));
        }
        summary
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
