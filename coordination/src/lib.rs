//! Support ticket triage core.
//!
//! A deterministic workflow engine that classifies a ticket, attaches
//! category documentation, drafts a reply through a text-completion port,
//! has it reviewed, and retries a bounded number of times before handing
//! the ticket to a human. The engine makes no network calls of its own; the
//! language model, knowledge store and escalation log are injected through
//! the traits in [`ports`].
//!
//! # Pipeline
//!
//! ```text
//! Classify → Retrieve → Draft → Review ─┬─ Approved ─────────→ Resolved
//!                                       ├─ 3rd rejection ────→ Escalated
//!                                       └─ else → RetryDraft → Review
//! ```

pub mod error;
pub mod escalation;
pub mod knowledge;
pub mod ports;
pub mod prompts;
pub mod review;
pub mod state;
pub mod ticket;
pub mod workflow;

pub use error::{
    CategoryError, CompletionError, EngineError, KnowledgeError, SinkError, TicketError,
};
pub use escalation::{CsvEscalationSink, MemoryEscalationSink, ESCALATION_NOTICE};
pub use knowledge::{DirectoryKnowledgeBase, StaticKnowledgeBase, NO_DOCUMENTATION};
pub use ports::{
    CompletionPort, CompletionRequest, EscalationRecord, EscalationSink, KnowledgeLookup,
    PromptKind,
};
pub use review::{ParsedReview, ReviewVerdict};
pub use state::{AuditEntry, AuditKind, TicketState};
pub use ticket::{Category, Ticket};
pub use workflow::{
    EngineConfig, Stage, TicketResult, TicketRun, TransitionRecord, WorkflowEngine, MAX_ATTEMPTS,
};
