//! Offline completion port returning fixed responses.
//!
//! Used by `--mock` runs and tests. With no overrides every ticket
//! classifies as Billing and the first draft is approved.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use triage_coordination::prompts::RETRY_FEEDBACK_LABEL;
use triage_coordination::{CompletionError, CompletionPort, CompletionRequest, PromptKind};

pub const CANNED_CATEGORY: &str = "Billing";

pub const CANNED_DRAFT: &str = "Dear Customer,\n\nThank you for reaching out. We apologize for \
the double charge on your account. Please verify your transaction history in the billing portal \
to confirm the charges. This issue may be due to a duplicate subscription or processing error. \
We have escalated your case to our billing team for further investigation, and you will hear \
back within 24-48 hours.\n\nBest regards,\nSupport Team";

pub const CANNED_RETRY_DRAFT: &str = "Hello Customer,\n\nThank you for contacting us regarding \
the double charge on your account. We apologize for the inconvenience. Please check your \
transaction history at https://billing.company.com to confirm the charges. If duplicates are \
found, submit a ticket with the transaction IDs, and a refund will be processed within 5-7 \
business days. If the issue persists, contact our billing team for further assistance.\n\n\
Best regards,\nSupport Team";

pub const CANNED_REVIEW: &str = "Approved";

pub const CANNED_FEEDBACK: &str = "State the refund timeline and next steps explicitly.";

#[derive(Debug, Default)]
pub struct CannedCompletion {
    overrides: HashMap<PromptKind, String>,
    calls: AtomicUsize,
}

impl CannedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request of `kind` with `text`.
    pub fn with_response(mut self, kind: PromptKind, text: impl Into<String>) -> Self {
        self.overrides.insert(kind, text.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CompletionPort for CannedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(text) = self.overrides.get(&request.kind) {
            return Ok(text.clone());
        }
        let text = match request.kind {
            PromptKind::Classify => CANNED_CATEGORY,
            PromptKind::Draft if request.prompt.contains(RETRY_FEEDBACK_LABEL) => {
                CANNED_RETRY_DRAFT
            }
            PromptKind::Draft => CANNED_DRAFT,
            PromptKind::Review => CANNED_REVIEW,
            PromptKind::Feedback => CANNED_FEEDBACK,
        };
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_coordination::{prompts, Category, Ticket};

    fn ticket() -> Ticket {
        Ticket::new("Charged twice", "Two charges this month").unwrap()
    }

    #[tokio::test]
    async fn test_defaults_per_kind() {
        let canned = CannedCompletion::new();
        let classify = canned.complete(&prompts::classify(&ticket())).await.unwrap();
        assert_eq!(classify, "Billing");

        let first = prompts::draft(&ticket(), Category::Billing, "docs");
        assert_eq!(canned.complete(&first).await.unwrap(), CANNED_DRAFT);

        let retry_ctx = prompts::retry_context("docs", &["Add refund timeline".to_string()]);
        let retry = prompts::draft(&ticket(), Category::Billing, &retry_ctx);
        assert_eq!(canned.complete(&retry).await.unwrap(), CANNED_RETRY_DRAFT);

        let review = prompts::review(&ticket(), Category::Billing, "docs", CANNED_DRAFT);
        assert_eq!(canned.complete(&review).await.unwrap(), "Approved");
        assert_eq!(canned.calls(), 4);
    }

    #[tokio::test]
    async fn test_override_wins() {
        let canned = CannedCompletion::new().with_response(PromptKind::Review, "Escalate");
        let review = prompts::review(&ticket(), Category::Billing, "docs", "draft");
        assert_eq!(canned.complete(&review).await.unwrap(), "Escalate");
    }
}
