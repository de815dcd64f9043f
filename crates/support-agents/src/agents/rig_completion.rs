//! Live completion port over an OpenAI-compatible endpoint.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rig::agent::Agent;
use rig::client::CompletionClient;
use rig::completion::{Prompt, PromptError};
use rig::providers::openai;
use tracing::{debug, warn};
use triage_coordination::{CompletionError, CompletionPort, CompletionRequest};

use crate::config::AgentConfig;

/// Type alias for agents built from OpenAI-compatible endpoints.
pub type OaiAgent = Agent<openai::completion::CompletionModel>;

const PREAMBLE: &str = "You are a customer support assistant. Follow the instructions in \
                        each message exactly and answer in the requested format.";

/// Builds one rig agent per request so each call carries its own
/// temperature and token limit.
pub struct RigCompletion {
    client: openai::CompletionsClient,
    model: String,
    timeout: Duration,
    max_retries: u32,
}

impl RigCompletion {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let client = openai::CompletionsClient::builder()
            .api_key(config.endpoint.api_key.as_deref().unwrap_or("not-needed"))
            .base_url(&config.endpoint.url)
            .build()
            .with_context(|| format!("Failed to build completion client ({})", config.endpoint.url))?;

        Ok(Self {
            client,
            model: config.endpoint.model.clone(),
            timeout: config.timeout(),
            max_retries: config.max_retries,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_agent(&self, request: &CompletionRequest) -> OaiAgent {
        self.client
            .agent(&self.model)
            .name(&request.kind.to_string())
            .preamble(PREAMBLE)
            .temperature(request.temperature)
            .max_tokens(u64::from(request.max_tokens))
            .build()
    }
}

#[async_trait]
impl CompletionPort for RigCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let agent = self.build_agent(request);
        let start = Instant::now();

        let response = match tokio::time::timeout(
            self.timeout,
            prompt_with_retry(&agent, &request.prompt, self.max_retries),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(CompletionError::request(e.to_string())),
            Err(_) => {
                warn!(
                    kind = %request.kind,
                    timeout_secs = self.timeout.as_secs(),
                    "Completion timed out"
                );
                return Err(CompletionError::Timeout {
                    secs: self.timeout.as_secs(),
                });
            }
        };

        debug!(
            kind = %request.kind,
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            chars = response.len(),
            "Completion returned"
        );

        let text = response.trim();
        if text.is_empty() {
            return Err(CompletionError::Empty);
        }
        Ok(text.to_string())
    }
}

/// Prompt an agent, retrying transient failures with exponential backoff
/// (2s, 4s, 8s, ...). Non-transient errors fail immediately.
async fn prompt_with_retry(
    agent: &OaiAgent,
    prompt: &str,
    max_retries: u32,
) -> Result<String, PromptError> {
    let mut attempt = 0;
    loop {
        match agent.prompt(prompt).await {
            Ok(response) => return Ok(response),
            Err(e) => {
                let err_str = e.to_string();
                if attempt >= max_retries || !is_transient_error(&err_str) {
                    return Err(e);
                }

                attempt += 1;
                let backoff = Duration::from_secs(2u64.pow(attempt));
                warn!(
                    attempt,
                    max_retries,
                    backoff_secs = backoff.as_secs(),
                    error = %err_str,
                    "Transient completion error, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

/// Whether an LLM API error is worth retrying: rate limits, gateway errors
/// and connection-level failures. Auth and schema errors are permanent.
fn is_transient_error(err_str: &str) -> bool {
    let err_lower = err_str.to_ascii_lowercase();
    err_str.contains("502")
        || err_str.contains("503")
        || err_str.contains("504")
        || err_str.contains("429")
        || err_lower.contains("connection")
        || err_lower.contains("timed out")
        || err_lower.contains("error sending request")
        || err_lower.contains("broken pipe")
        || err_lower.contains("reset by peer")
}
