//! Ticket-resolution workflow: the stage graph, the stage functions, and the
//! engine that drives them.

pub mod engine;
pub mod stages;
pub mod state_machine;

pub use engine::{next_after_review, EngineConfig, TicketResult, TicketRun, WorkflowEngine};
pub use state_machine::{IllegalTransition, Stage, StateMachine, TransitionRecord, MAX_ATTEMPTS};
