//! Reviewer response parser.
//!
//! The reviewer is asked for a two-line answer:
//!
//! ```text
//! response := ws* status body ( "\nFeedback: " feedback )?
//! status   := "Approved" | "Escalate"
//! ```
//!
//! Anything that does not start with `Approved` is treated as an escalation;
//! `recognized` records whether the status token was one of the two literals
//! so the caller can log malformed answers separately.

use serde::{Deserialize, Serialize};

const APPROVED: &str = "Approved";
const ESCALATE: &str = "Escalate";
const FEEDBACK_MARKER: &str = "\nFeedback: ";

/// Reviewer decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVerdict {
    Approved,
    Escalate,
}

impl ReviewVerdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => APPROVED,
            Self::Escalate => ESCALATE,
        }
    }

    pub fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Result of parsing one reviewer response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReview {
    pub verdict: ReviewVerdict,
    /// Trimmed text after the first feedback marker; `None` when the marker
    /// is missing or nothing follows it.
    pub feedback: Option<String>,
    /// Whether the response started with one of the two status tokens.
    pub recognized: bool,
}

impl ParsedReview {
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();

        let (verdict, recognized) = if text.starts_with(APPROVED) {
            (ReviewVerdict::Approved, true)
        } else {
            (ReviewVerdict::Escalate, text.starts_with(ESCALATE))
        };

        let feedback = text
            .split_once(FEEDBACK_MARKER)
            .map(|(_, rest)| rest.trim())
            .filter(|rest| !rest.is_empty())
            .map(str::to_string);

        Self {
            verdict,
            feedback,
            recognized,
        }
    }
}
