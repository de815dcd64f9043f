//! Error types for the triage core.
//!
//! Only [`EngineError`] ever reaches the caller of a run; the port errors
//! are recovered at stage boundaries and survive only as audit entries.

use thiserror::Error;

use crate::workflow::state_machine::IllegalTransition;

/// Rejected ticket input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketError {
    /// Subject or description is empty.
    #[error("Please provide both subject and description")]
    MissingField,

    #[error("Subject must be {max} characters or less (got {len})")]
    SubjectTooLong { len: usize, max: usize },

    #[error("Description must be {max} characters or less (got {len})")]
    DescriptionTooLong { len: usize, max: usize },
}

/// A label that names none of the four categories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown category: {0}")]
pub struct CategoryError(pub String);

/// Failure reported by a text-completion backend.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Transport or backend failure (network, HTTP status, provider error).
    #[error("Completion request failed: {0}")]
    Request(String),

    /// The backend did not answer within the configured deadline.
    #[error("Completion timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The backend answered with nothing usable.
    #[error("Completion returned an empty response")]
    Empty,
}

impl CompletionError {
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request(message.into())
    }
}

/// Failure while reading knowledge-base content.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Knowledge lookup for '{key}' failed: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while appending an escalation record.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Escalation sink IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Escalation record could not be encoded: {0}")]
    Encode(#[from] csv::Error),

    /// Another writer panicked while holding the sink lock.
    #[error("Escalation sink lock poisoned")]
    Poisoned,
}

/// Errors that abort a ticket run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The escalation record could not be persisted. This is the only
    /// externally caused failure a run surfaces.
    #[error("Failed to record escalation for '{subject}': {source}")]
    Sink {
        subject: String,
        #[source]
        source: SinkError,
    },

    /// The engine attempted a transition outside the pipeline graph.
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
}

impl EngineError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sink { .. } => "ESCALATION_SINK_FAILED",
            Self::IllegalTransition(_) => "ILLEGAL_TRANSITION",
        }
    }
}
