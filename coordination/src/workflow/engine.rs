//! Workflow engine: drives one ticket through the pipeline.
//!
//! ```text
//! Classify → Retrieve → Draft → Review ─┬─ approved ──────────→ Resolved
//!                                       ├─ attempt >= 3 ──────→ Escalated
//!                                       └─ else → RetryDraft → Review
//! ```
//!
//! Each stage is a transition function over [`TicketState`]; the
//! [`StateMachine`] validates every edge so the retry bound holds even if a
//! stage misbehaves.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::EngineError;
use crate::ports::{CompletionPort, EscalationSink, KnowledgeLookup};
use crate::state::TicketState;
use crate::ticket::{Category, Ticket};
use crate::workflow::state_machine::{Stage, StateMachine, TransitionRecord, MAX_ATTEMPTS};

/// Engine options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ask the feedback template for a rejection reason when the reviewer
    /// escalates without one.
    #[serde(default)]
    pub elicit_feedback: bool,
}

/// Final answer for one ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketResult {
    pub category: Category,
    pub output: String,
    pub approved: bool,
    /// Reason given by the final rejection; only set when not approved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// A finished run with its full trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketRun {
    pub result: TicketResult,
    pub state: TicketState,
    pub transitions: Vec<TransitionRecord>,
    pub elapsed_ms: u64,
}

impl TicketRun {
    pub fn escalated(&self) -> bool {
        self.transitions
            .last()
            .is_some_and(|t| t.to == Stage::Escalated)
    }
}

/// Runs tickets through the triage pipeline.
///
/// Cheap to clone; clones share the same ports, so concurrent runs all
/// append to the same escalation sink.
#[derive(Clone)]
pub struct WorkflowEngine {
    pub(crate) completion: Arc<dyn CompletionPort>,
    pub(crate) knowledge: Arc<dyn KnowledgeLookup>,
    pub(crate) sink: Arc<dyn EscalationSink>,
    pub(crate) config: EngineConfig,
}

impl WorkflowEngine {
    pub fn new(
        completion: Arc<dyn CompletionPort>,
        knowledge: Arc<dyn KnowledgeLookup>,
        sink: Arc<dyn EscalationSink>,
    ) -> Self {
        Self {
            completion,
            knowledge,
            sink,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run a ticket to a terminal stage.
    pub async fn run(&self, ticket: Ticket) -> Result<TicketResult, EngineError> {
        self.run_traced(ticket).await.map(|run| run.result)
    }

    /// Run a ticket and keep the final state and transition log.
    pub async fn run_traced(&self, ticket: Ticket) -> Result<TicketRun, EngineError> {
        let started = Instant::now();
        let mut sm = StateMachine::new();
        let mut state = TicketState::new(ticket);

        info!(subject = %state.ticket().subject(), "Ticket received");

        while !sm.is_terminal() {
            match sm.current() {
                Stage::Classify => {
                    state = self.classify(state).await;
                    let reason = state.category().map(|c| format!("classified as {c}"));
                    sm.advance(Stage::Retrieve, reason.as_deref())?;
                }
                Stage::Retrieve => {
                    state = self.retrieve(state);
                    sm.advance(Stage::Draft, None)?;
                }
                Stage::Draft => {
                    state = self.draft(state, false).await;
                    sm.advance(Stage::Review, None)?;
                }
                Stage::RetryDraft => {
                    state = self.draft(state, true).await;
                    sm.advance(Stage::Review, None)?;
                }
                Stage::Review => {
                    state = self.review(state).await?;
                    sm.set_attempt(state.attempt);
                    let next = next_after_review(&state);
                    let reason = match next {
                        Stage::Resolved => "draft approved".to_string(),
                        Stage::Escalated => format!("rejected {} times", state.attempt),
                        _ => format!("rejected (attempt {})", state.attempt),
                    };
                    sm.advance(next, Some(&reason))?;
                }
                Stage::Resolved | Stage::Escalated => {}
            }
        }

        let result = TicketResult {
            category: state.category().unwrap_or(Category::General),
            output: state.output.clone().unwrap_or_default(),
            approved: state.approved,
            feedback: if state.approved {
                None
            } else {
                state.last_rejection().map(str::to_string)
            },
        };

        info!(
            category = %result.category,
            approved = result.approved,
            attempts = state.attempt,
            drafts = state.drafts().len(),
            summary = %sm.summary(),
            "Ticket run finished"
        );

        Ok(TicketRun {
            result,
            state,
            transitions: sm.into_transitions(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Routing decision after a review.
pub fn next_after_review(state: &TicketState) -> Stage {
    if state.approved {
        Stage::Resolved
    } else if state.attempt >= MAX_ATTEMPTS {
        Stage::Escalated
    } else {
        Stage::RetryDraft
    }
}
