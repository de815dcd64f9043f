//! Ticket input model and the closed category set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CategoryError, TicketError};

/// Maximum subject length (characters) accepted at submission.
pub const MAX_SUBJECT_CHARS: usize = 100;
/// Maximum description length (characters) accepted at submission.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// An immutable support ticket as submitted by a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    subject: String,
    description: String,
}

impl Ticket {
    /// Build a ticket, enforcing the submission limits.
    ///
    /// Both fields must be non-blank; lengths are counted in characters,
    /// not bytes.
    pub fn new(
        subject: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, TicketError> {
        let subject = subject.into();
        let description = description.into();

        if subject.trim().is_empty() || description.trim().is_empty() {
            return Err(TicketError::MissingField);
        }
        let subject_len = subject.chars().count();
        if subject_len > MAX_SUBJECT_CHARS {
            return Err(TicketError::SubjectTooLong {
                len: subject_len,
                max: MAX_SUBJECT_CHARS,
            });
        }
        let description_len = description.chars().count();
        if description_len > MAX_DESCRIPTION_CHARS {
            return Err(TicketError::DescriptionTooLong {
                len: description_len,
                max: MAX_DESCRIPTION_CHARS,
            });
        }

        Ok(Self {
            subject,
            description,
        })
    }

    /// Build a ticket without length checks.
    ///
    /// For callers that already validated the input (e.g. a front end with
    /// its own form limits).
    pub fn new_unchecked(subject: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            description: description.into(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// The fixed set of ticket categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Billing,
    Technical,
    Security,
    General,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Billing,
        Category::Technical,
        Category::Security,
        Category::General,
    ];

    /// Capitalized display name, as expected from the classifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Billing => "Billing",
            Self::Technical => "Technical",
            Self::Security => "Security",
            Self::General => "General",
        }
    }

    /// Key used to look up category documentation (lowercased name).
    pub fn knowledge_key(self) -> String {
        self.as_str().to_lowercase()
    }

    /// Parse a raw classifier answer.
    ///
    /// Surrounding whitespace and trailing periods are ignored, and the
    /// comparison is case-insensitive. Anything else is rejected.
    pub fn from_label(raw: &str) -> Option<Self> {
        let label = raw.trim().trim_end_matches('.').trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| CategoryError(s.to_string()))
    }
}
