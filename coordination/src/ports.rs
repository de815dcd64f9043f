//! Seams to the collaborators the engine does not own.
//!
//! | Port               | Called by         | Failure handling            |
//! |--------------------|-------------------|-----------------------------|
//! | `CompletionPort`   | every LLM stage   | recovered at stage boundary |
//! | `KnowledgeLookup`  | retrieval         | recovered (sentinel context) |
//! | `EscalationSink`   | terminal review   | surfaced as `EngineError`   |

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CompletionError, KnowledgeError, SinkError};

/// Which template produced a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Classify,
    Draft,
    Review,
    Feedback,
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classify => write!(f, "classify"),
            Self::Draft => write!(f, "draft"),
            Self::Review => write!(f, "review"),
            Self::Feedback => write!(f, "feedback"),
        }
    }
}

/// A rendered prompt plus generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub kind: PromptKind,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Opaque text-completion capability.
///
/// Implementations must be reentrant: independent runs share one instance.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionPort: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

/// Category documentation lookup.
///
/// `Ok(None)` means no entry exists for the key.
#[cfg_attr(test, mockall::automock)]
pub trait KnowledgeLookup: Send + Sync {
    fn lookup(&self, key: &str) -> Result<Option<String>, KnowledgeError>;
}

/// Durable record of a ticket handed over to a human agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationRecord {
    /// Local time, `%Y-%m-%d %H:%M:%S`.
    pub timestamp: String,
    pub subject: String,
    pub description: String,
    pub category: String,
    pub draft: String,
    pub reason: String,
}

/// Append-only escalation log.
///
/// `append` must write each record atomically with respect to concurrent
/// callers.
#[cfg_attr(test, mockall::automock)]
pub trait EscalationSink: Send + Sync {
    fn append(&self, record: &EscalationRecord) -> Result<(), SinkError>;
}
