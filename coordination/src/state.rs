//! The per-run workflow record and its audit trail.

use serde::{Deserialize, Serialize};

use crate::ticket::{Category, Ticket};
use crate::workflow::state_machine::Stage;

/// Why an audit entry was written.
///
/// Every recovered condition has its own kind so a run can be diagnosed
/// after the fact without inspecting message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Received,
    Classified,
    /// Classifier answered with something outside the category set.
    InvalidCategory,
    /// Classifier call failed.
    ClassificationFailed,
    ContextRetrieved,
    /// No documentation exists for the category.
    RetrievalMissing,
    /// The knowledge store could not be read.
    RetrievalFailed,
    DraftGenerated,
    /// Draft call failed; an empty draft was recorded.
    DraftFailed,
    ReviewResult,
    /// Reviewer answered without a recognized status token.
    ReviewInvalid,
    /// Reviewer call failed.
    ReviewFailed,
    /// Review short-circuited on an empty draft.
    ReviewSkipped,
    Feedback,
    /// Feedback elicitation call failed.
    FeedbackFailed,
    Escalated,
}

impl AuditKind {
    /// Whether this entry records a recovered failure.
    pub fn is_diagnostic(self) -> bool {
        matches!(
            self,
            Self::InvalidCategory
                | Self::ClassificationFailed
                | Self::RetrievalMissing
                | Self::RetrievalFailed
                | Self::DraftFailed
                | Self::ReviewInvalid
                | Self::ReviewFailed
                | Self::ReviewSkipped
                | Self::FeedbackFailed
        )
    }
}

/// One line of the human-readable run trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub stage: Stage,
    pub kind: AuditKind,
    pub message: String,
}

/// Mutable record threaded through every stage of one run.
///
/// `category` and `context` are write-once; `drafts`, `feedbacks` and `log`
/// only ever grow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketState {
    ticket: Ticket,
    category: Option<Category>,
    context: Option<String>,
    pub draft: String,
    drafts: Vec<String>,
    feedbacks: Vec<String>,
    pub attempt: u32,
    pub approved: bool,
    pub output: Option<String>,
    /// Feedback from the most recent rejection; `None` when that review
    /// gave no reason.
    #[serde(default)]
    last_rejection: Option<String>,
    log: Vec<AuditEntry>,
}

impl TicketState {
    /// Fresh state for a newly received ticket.
    pub fn new(ticket: Ticket) -> Self {
        let mut state = Self {
            ticket,
            category: None,
            context: None,
            draft: String::new(),
            drafts: Vec::new(),
            feedbacks: Vec::new(),
            attempt: 0,
            approved: false,
            output: None,
            last_rejection: None,
            log: Vec::new(),
        };
        let message = format!("Received ticket: {}", state.ticket.subject());
        state.record(Stage::Classify, AuditKind::Received, message);
        state
    }

    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn drafts(&self) -> &[String] {
        &self.drafts
    }

    pub fn feedbacks(&self) -> &[String] {
        &self.feedbacks
    }

    pub fn log(&self) -> &[AuditEntry] {
        &self.log
    }

    /// Set the category. Returns `false` (and leaves the state untouched)
    /// if a category was already assigned.
    pub fn set_category(&mut self, category: Category) -> bool {
        if self.category.is_some() {
            return false;
        }
        self.category = Some(category);
        true
    }

    /// Set the retrieved context. Returns `false` if already set.
    pub fn set_context(&mut self, context: String) -> bool {
        if self.context.is_some() {
            return false;
        }
        self.context = Some(context);
        true
    }

    /// Replace the current draft and append it to the draft history.
    pub fn push_draft(&mut self, draft: String) {
        self.drafts.push(draft.clone());
        self.draft = draft;
    }

    /// Append reviewer feedback; blank feedback is dropped.
    pub fn push_feedback(&mut self, feedback: &str) {
        let feedback = feedback.trim();
        if !feedback.is_empty() {
            self.feedbacks.push(feedback.to_string());
        }
    }

    /// Most recent reviewer feedback, if any.
    pub fn last_feedback(&self) -> Option<&str> {
        self.feedbacks.last().map(String::as_str)
    }

    /// Reason given by the most recent rejection, if it gave one.
    pub fn last_rejection(&self) -> Option<&str> {
        self.last_rejection.as_deref()
    }

    /// Record the outcome of a rejecting review, replacing any earlier
    /// reason. Blank feedback clears it.
    pub fn set_last_rejection(&mut self, feedback: Option<&str>) {
        self.last_rejection = feedback
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string);
    }

    pub fn record(&mut self, stage: Stage, kind: AuditKind, message: impl Into<String>) {
        self.log.push(AuditEntry {
            stage,
            kind,
            message: message.into(),
        });
    }

    /// Entries of the given kind, in order.
    pub fn entries_of(&self, kind: AuditKind) -> impl Iterator<Item = &AuditEntry> {
        self.log.iter().filter(move |e| e.kind == kind)
    }
}
