//! Knowledge-base adapters.
//!
//! Documentation is keyed by lowercased category name. The directory layout
//! is one plain-text file per key:
//!
//! ```text
//! knowledge/
//!   billing.txt
//!   technical.txt
//!   security.txt
//!   general.txt
//! ```

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::KnowledgeError;
use crate::ports::KnowledgeLookup;

/// Hard cap on context characters handed to the drafting prompt.
pub const MAX_CONTEXT_CHARS: usize = 1500;

/// Context used when no documentation exists for a category.
pub const NO_DOCUMENTATION: &str = "No relevant documentation found.";

/// Trim and cap retrieved text at [`MAX_CONTEXT_CHARS`] characters.
pub fn truncate_context(text: &str) -> String {
    text.trim().chars().take(MAX_CONTEXT_CHARS).collect()
}

/// Reads `<root>/<key>.txt`.
pub struct DirectoryKnowledgeBase {
    root: PathBuf,
}

impl DirectoryKnowledgeBase {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        // Keys are category names; anything that could escape the root is
        // treated as a missing entry.
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }
        Some(self.root.join(format!("{key}.txt")))
    }
}

impl KnowledgeLookup for DirectoryKnowledgeBase {
    fn lookup(&self, key: &str) -> Result<Option<String>, KnowledgeError> {
        let Some(path) = self.path_for(key) else {
            return Ok(None);
        };
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(KnowledgeError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// In-memory knowledge base.
#[derive(Debug, Clone, Default)]
pub struct StaticKnowledgeBase {
    entries: HashMap<String, String>,
}

impl StaticKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.entries.insert(key.into(), text.into());
        self
    }

    /// Short built-in articles for every category; used by mock mode.
    pub fn builtin() -> Self {
        Self::new()
            .with_entry(
                "billing",
                "Duplicate charges: ask the customer to check the billing portal transaction \
                 history. Confirmed duplicates are refunded within 5-7 business days.",
            )
            .with_entry(
                "technical",
                "Troubleshooting: clear the browser cache, retry in a private window, and \
                 collect the exact error message and timestamp before escalating.",
            )
            .with_entry(
                "security",
                "Suspected compromise: reset the password immediately, enable two-factor \
                 authentication, and review active sessions from account settings.",
            )
            .with_entry(
                "general",
                "General enquiries are answered within one business day. Point customers to \
                 the help centre for self-service articles.",
            )
    }
}

impl KnowledgeLookup for StaticKnowledgeBase {
    fn lookup(&self, key: &str) -> Result<Option<String>, KnowledgeError> {
        Ok(self.entries.get(key).cloned())
    }
}
