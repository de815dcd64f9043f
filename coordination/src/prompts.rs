//! Prompt templates for each LLM stage of the triage pipeline.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever template content changes
//! so a logged run can be traced back to the wording that produced it.

use crate::ports::{CompletionRequest, PromptKind};
use crate::ticket::{Category, Ticket};

/// Prompt version. Bump on any template content change.
pub const PROMPT_VERSION: &str = "1.2.0";

const CLASSIFY_MAX_TOKENS: u32 = 50;
const DRAFT_MAX_TOKENS: u32 = 400;
const DRAFT_TEMPERATURE: f64 = 0.3;
const REVIEW_MAX_TOKENS: u32 = 100;
const FEEDBACK_MAX_TOKENS: u32 = 150;

/// Label introducing reviewer feedback in a retry draft's context.
pub const RETRY_FEEDBACK_LABEL: &str = "Feedback from previous draft:";

/// Appended to the retry context when the reviewer gave no feedback.
pub const DEFAULT_RETRY_GUIDANCE: &str =
    "No specific feedback provided. Ensure the response is concise and actionable.";

/// Classifier prompt. Expects a bare category name back.
pub fn classify(ticket: &Ticket) -> CompletionRequest {
    let prompt = format!(
        "\
Classify the ticket into one of: [Billing, Technical, Security, General]
Subject: {subject}
Description: {description}
Respond ONLY with the category name (e.g., Billing).
",
        subject = ticket.subject(),
        description = ticket.description(),
    );
    CompletionRequest {
        kind: PromptKind::Classify,
        prompt,
        max_tokens: CLASSIFY_MAX_TOKENS,
        temperature: 0.0,
    }
}

/// Draft prompt. `context` already carries any retry feedback.
pub fn draft(ticket: &Ticket, category: Category, context: &str) -> CompletionRequest {
    let prompt = format!(
        "\
You are a support agent. Generate a concise, professional response to the customer based on \
the ticket and context. Ensure the response:
1. Starts with a polite, personal greeting (e.g., 'Hello Customer').
2. Addresses the issue directly with clear, actionable steps from the context (e.g., refund \
timelines, troubleshooting).
3. Ends with a professional closing (e.g., 'Best regards, Support Team').
4. Is concise, under 300 words, avoiding repetition or unnecessary details.
5. Avoids placeholders like '[Customer]' and uses 'Customer' or a generic term.

Ticket Subject: {subject}
Ticket Description: {description}
Category: {category}
Context: {context}

Response:
",
        subject = ticket.subject(),
        description = ticket.description(),
    );
    CompletionRequest {
        kind: PromptKind::Draft,
        prompt,
        max_tokens: DRAFT_MAX_TOKENS,
        temperature: DRAFT_TEMPERATURE,
    }
}

/// Context for a retry draft: the retrieved documentation followed by all
/// reviewer feedback so far.
pub fn retry_context(context: &str, feedbacks: &[String]) -> String {
    let guidance = if feedbacks.is_empty() {
        DEFAULT_RETRY_GUIDANCE.to_string()
    } else {
        feedbacks.join("; ")
    };
    format!("{context}\n\n{RETRY_FEEDBACK_LABEL} {guidance}")
}

/// Reviewer prompt. Expects `Approved` or `Escalate`, optionally followed
/// by a `Feedback:` line.
pub fn review(ticket: &Ticket, category: Category, context: &str, draft: &str) -> CompletionRequest {
    let prompt = format!(
        "\
You are a senior support agent. Review the draft response for:
1. Relevance: Does it address the ticket's issue and match the category?
2. Completeness: Does it include actionable steps (e.g., refund timeline, troubleshooting) and \
a closing?
3. Professionalism: Is the tone polite, professional, and includes a personal greeting?

Return 'Approved' if the draft is relevant, mostly complete (minor issues like slight verbosity \
are acceptable), and professional.
Return 'Escalate' only if the draft is irrelevant, significantly incomplete (e.g., missing key \
steps or closing), or unprofessional.

If escalating, provide specific, concise feedback on what to improve (e.g., 'Add a closing', \
'Include refund timeline', 'Simplify instructions').

Ticket Subject: {subject}
Ticket Description: {description}
Category: {category}
Context: {context}
Draft Response: {draft}

Response: [Approved or Escalate]
Feedback (if Escalate): [specific feedback]
",
        subject = ticket.subject(),
        description = ticket.description(),
    );
    CompletionRequest {
        kind: PromptKind::Review,
        prompt,
        max_tokens: REVIEW_MAX_TOKENS,
        temperature: 0.0,
    }
}

/// Feedback prompt, used to elicit a rejection reason when the reviewer
/// escalated without one.
pub fn feedback(
    ticket: &Ticket,
    category: Category,
    context: &str,
    draft: &str,
) -> CompletionRequest {
    let prompt = format!(
        "\
You are a senior support agent. The draft response was rejected. Provide concise, specific \
feedback on why the draft is not suitable (e.g., irrelevant, missing key steps, unprofessional) \
and suggest improvements (e.g., 'Add refund timeline', 'Include a closing').

Ticket Subject: {subject}
Ticket Description: {description}
Category: {category}
Context: {context}
Draft Response: {draft}

Feedback:
",
        subject = ticket.subject(),
        description = ticket.description(),
    );
    CompletionRequest {
        kind: PromptKind::Feedback,
        prompt,
        max_tokens: FEEDBACK_MAX_TOKENS,
        temperature: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket() -> Ticket {
        Ticket::new_unchecked("I was charged twice", "Two charges on my card")
    }

    #[test]
    fn test_classify_renders_ticket_fields() {
        let req = classify(&ticket());
        assert_eq!(req.kind, PromptKind::Classify);
        assert!(req.prompt.contains("Subject: I was charged twice"));
        assert!(req.prompt.contains("Description: Two charges on my card"));
        assert!(req.prompt.contains("[Billing, Technical, Security, General]"));
        assert_eq!(req.temperature, 0.0);
        assert_eq!(req.max_tokens, 50);
    }

    #[test]
    fn test_draft_parameters() {
        let req = draft(&ticket(), Category::Billing, "Refunds take 5-7 days.");
        assert_eq!(req.kind, PromptKind::Draft);
        assert!(req.prompt.contains("Category: Billing"));
        assert!(req.prompt.contains("Context: Refunds take 5-7 days."));
        assert_eq!(req.max_tokens, 400);
        assert!((req.temperature - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_retry_context_default_guidance() {
        let ctx = retry_context("docs", &[]);
        assert_eq!(
            ctx,
            "docs\n\nFeedback from previous draft: No specific feedback provided. \
             Ensure the response is concise and actionable."
        );
    }

    #[test]
    fn test_retry_context_joins_feedback() {
        let ctx = retry_context(
            "docs",
            &["Add refund timeline".to_string(), "Add a closing".to_string()],
        );
        assert!(ctx.ends_with("Feedback from previous draft: Add refund timeline; Add a closing"));
    }

    #[test]
    fn test_review_includes_draft() {
        let req = review(&ticket(), Category::Billing, "docs", "Hello Customer, ...");
        assert_eq!(req.kind, PromptKind::Review);
        assert!(req.prompt.contains("Draft Response: Hello Customer, ..."));
        assert!(req.prompt.contains("Response: [Approved or Escalate]"));
        assert_eq!(req.max_tokens, 100);
        assert_eq!(req.temperature, 0.0);
    }

    #[test]
    fn test_feedback_prompt() {
        let req = feedback(&ticket(), Category::General, "docs", "bad draft");
        assert_eq!(req.kind, PromptKind::Feedback);
        assert!(req.prompt.trim_end().ends_with("Feedback:"));
        assert!(req.prompt.contains("Draft Response: bad draft"));
    }
}
