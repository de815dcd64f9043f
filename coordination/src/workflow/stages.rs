//! Stage transition functions.
//!
//! Each stage takes the run state by value and hands back the next state.
//! Completion and knowledge failures are absorbed here and leave an audit
//! entry; only the escalation sink can fail a stage.

use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::escalation::{escalation_timestamp, ESCALATION_NOTICE};
use crate::knowledge::{truncate_context, NO_DOCUMENTATION};
use crate::ports::EscalationRecord;
use crate::prompts;
use crate::review::{ParsedReview, ReviewVerdict};
use crate::state::{AuditKind, TicketState};
use crate::ticket::Category;
use crate::workflow::engine::WorkflowEngine;
use crate::workflow::state_machine::{Stage, MAX_ATTEMPTS};

/// Feedback recorded when a review is skipped because drafting failed.
pub const EMPTY_DRAFT_FEEDBACK: &str = "Draft generation failed; regenerate the response.";

const NO_FEEDBACK: &str = "No specific feedback provided.";

impl WorkflowEngine {
    pub(crate) async fn classify(&self, mut state: TicketState) -> TicketState {
        let request = prompts::classify(state.ticket());

        let category = match self.completion.complete(&request).await {
            Ok(raw) => match Category::from_label(&raw) {
                Some(category) => {
                    state.record(
                        Stage::Classify,
                        AuditKind::Classified,
                        format!("Ticket classified as: {category}"),
                    );
                    category
                }
                None => {
                    warn!(response = %raw.trim(), "Unrecognized category, falling back to General");
                    state.record(
                        Stage::Classify,
                        AuditKind::InvalidCategory,
                        format!("Invalid category: {}. Using fallback: General", raw.trim()),
                    );
                    Category::General
                }
            },
            Err(e) => {
                warn!(error = %e, "Classification call failed, falling back to General");
                state.record(
                    Stage::Classify,
                    AuditKind::ClassificationFailed,
                    format!("Classification error: {e}. Using fallback: General"),
                );
                Category::General
            }
        };

        state.set_category(category);
        info!(category = %category, "Ticket classified");
        state
    }

    pub(crate) fn retrieve(&self, mut state: TicketState) -> TicketState {
        let category = state.category().unwrap_or(Category::General);
        let key = category.knowledge_key();

        let context = match self.knowledge.lookup(&key) {
            Ok(Some(text)) => {
                state.record(
                    Stage::Retrieve,
                    AuditKind::ContextRetrieved,
                    format!("Retrieved context for category {category}."),
                );
                truncate_context(&text)
            }
            Ok(None) => {
                warn!(key = %key, "No documentation for category");
                state.record(
                    Stage::Retrieve,
                    AuditKind::RetrievalMissing,
                    format!("Retrieval failed: No documentation for category {category}."),
                );
                NO_DOCUMENTATION.to_string()
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Knowledge lookup failed");
                state.record(
                    Stage::Retrieve,
                    AuditKind::RetrievalFailed,
                    format!("Retrieval failed: {e}"),
                );
                NO_DOCUMENTATION.to_string()
            }
        };

        debug!(chars = context.chars().count(), "Context attached");
        state.set_context(context);
        state
    }

    /// First draft (`retry == false`) or a feedback-augmented retry draft.
    pub(crate) async fn draft(&self, mut state: TicketState, retry: bool) -> TicketState {
        let stage = if retry { Stage::RetryDraft } else { Stage::Draft };
        let category = state.category().unwrap_or(Category::General);
        let base = state.context().unwrap_or(NO_DOCUMENTATION);
        let context = if retry {
            prompts::retry_context(base, state.feedbacks())
        } else {
            base.to_string()
        };

        let request = prompts::draft(state.ticket(), category, &context);
        match self.completion.complete(&request).await {
            Ok(text) => {
                let text = text.trim().to_string();
                let label = if retry {
                    "Retry draft generated"
                } else {
                    "Draft response generated"
                };
                state.record(stage, AuditKind::DraftGenerated, format!("{label}: {text}"));
                state.push_draft(text);
            }
            Err(e) => {
                warn!(error = %e, retry, "Draft call failed");
                state.record(
                    stage,
                    AuditKind::DraftFailed,
                    format!("Draft generation failed: {e}"),
                );
                state.push_draft(String::new());
            }
        }

        debug!(drafts = state.drafts().len(), retry, "Draft recorded");
        state
    }

    pub(crate) async fn review(&self, mut state: TicketState) -> Result<TicketState, EngineError> {
        let category = state.category().unwrap_or(Category::General);
        let context = state.context().unwrap_or(NO_DOCUMENTATION).to_string();

        let parsed = if state.draft.trim().is_empty() {
            state.record(
                Stage::Review,
                AuditKind::ReviewSkipped,
                "Review skipped: empty draft. Treating as Escalate",
            );
            ParsedReview {
                verdict: ReviewVerdict::Escalate,
                feedback: Some(EMPTY_DRAFT_FEEDBACK.to_string()),
                recognized: true,
            }
        } else {
            let request = prompts::review(state.ticket(), category, &context, &state.draft);
            match self.completion.complete(&request).await {
                Ok(raw) => {
                    let parsed = ParsedReview::parse(&raw);
                    if !parsed.recognized {
                        warn!(response = %raw.trim(), "Invalid review response");
                        state.record(
                            Stage::Review,
                            AuditKind::ReviewInvalid,
                            format!("Invalid review response: {}. Treating as Escalate", raw.trim()),
                        );
                    }
                    parsed
                }
                Err(e) => {
                    warn!(error = %e, "Review call failed");
                    state.record(
                        Stage::Review,
                        AuditKind::ReviewFailed,
                        format!("Review call failed: {e}. Treating as Escalate"),
                    );
                    ParsedReview {
                        verdict: ReviewVerdict::Escalate,
                        feedback: None,
                        recognized: false,
                    }
                }
            }
        };

        state.record(
            Stage::Review,
            AuditKind::ReviewResult,
            format!("Draft review result: {}", parsed.verdict.as_str()),
        );

        if parsed.verdict.is_approved() {
            state.approved = true;
            state.output = Some(state.draft.clone());
            info!(attempt = state.attempt, "Draft approved");
            return Ok(state);
        }

        let feedback = match parsed.feedback {
            Some(feedback) => Some(feedback),
            None if self.config.elicit_feedback => {
                self.elicit_feedback(&mut state, category, &context).await
            }
            None => None,
        };

        state.set_last_rejection(feedback.as_deref());
        if let Some(feedback) = feedback.as_deref() {
            state.push_feedback(feedback);
            state.record(
                Stage::Review,
                AuditKind::Feedback,
                format!("Feedback for rejected draft: {feedback}"),
            );
        }

        if state.attempt + 1 >= MAX_ATTEMPTS {
            state.attempt += 1;
            let record = EscalationRecord {
                timestamp: escalation_timestamp(),
                subject: state.ticket().subject().to_string(),
                description: state.ticket().description().to_string(),
                category: category.to_string(),
                draft: state.draft.clone(),
                reason: format!(
                    "Draft rejected after {} attempts. Feedback: {}",
                    state.attempt,
                    feedback.as_deref().unwrap_or(NO_FEEDBACK)
                ),
            };
            self.sink
                .append(&record)
                .map_err(|source| EngineError::Sink {
                    subject: record.subject.clone(),
                    source,
                })?;

            state.output = Some(ESCALATION_NOTICE.to_string());
            state.record(
                Stage::Review,
                AuditKind::Escalated,
                format!("Escalated to human agent: {}", record.reason),
            );
            warn!(attempts = state.attempt, "Ticket escalated to human agent");
            return Ok(state);
        }

        state.attempt += 1;
        info!(attempt = state.attempt, "Draft rejected, retrying");
        Ok(state)
    }

    async fn elicit_feedback(
        &self,
        state: &mut TicketState,
        category: Category,
        context: &str,
    ) -> Option<String> {
        let request = prompts::feedback(state.ticket(), category, context, &state.draft);
        match self.completion.complete(&request).await {
            Ok(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Err(e) => {
                warn!(error = %e, "Feedback call failed");
                state.record(
                    Stage::Review,
                    AuditKind::FeedbackFailed,
                    format!("Feedback call failed: {e}"),
                );
                None
            }
        }
    }
}
