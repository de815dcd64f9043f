//! Runtime configuration for the triage agents.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (applied by the binary after loading)
//! 2. Values in the TOML file passed with `--config`
//! 3. Environment variables (`TRIAGE_*`)
//! 4. Built-in defaults
//!
//! A TOML file only needs the keys it wants to change:
//!
//! ```toml
//! knowledge_dir = "docs/knowledge"
//! timeout_secs = 30
//!
//! [endpoint]
//! url = "http://localhost:8080/v1"
//! model = "mistral-7b-instruct"
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_LLM_URL: &str = "https://router.huggingface.co/v1";
const DEFAULT_LLM_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";
const DEFAULT_KNOWLEDGE_DIR: &str = "knowledge";
const DEFAULT_ESCALATION_LOG: &str = "escalation_log.csv";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_CONCURRENCY: usize = 4;

const ENV_LLM_URL: &str = "TRIAGE_LLM_URL";
const ENV_LLM_MODEL: &str = "TRIAGE_LLM_MODEL";
const ENV_LLM_API_KEY: &str = "TRIAGE_LLM_API_KEY";
/// Fallback key name used by Hugging Face tooling.
const ENV_HF_TOKEN: &str = "HUGGINGFACE_API_TOKEN";
const ENV_KNOWLEDGE_DIR: &str = "TRIAGE_KNOWLEDGE_DIR";
const ENV_ESCALATION_LOG: &str = "TRIAGE_ESCALATION_LOG";
const ENV_TELEMETRY_LOG: &str = "TRIAGE_TELEMETRY_LOG";
const ENV_TIMEOUT_SECS: &str = "TRIAGE_TIMEOUT_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// OpenAI-compatible inference endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub url: String,
    pub model: String,
    /// Bearer token. Local servers usually accept any value.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            url: env::var(ENV_LLM_URL).unwrap_or_else(|_| DEFAULT_LLM_URL.into()),
            model: env::var(ENV_LLM_MODEL).unwrap_or_else(|_| DEFAULT_LLM_MODEL.into()),
            api_key: env::var(ENV_LLM_API_KEY)
                .or_else(|_| env::var(ENV_HF_TOKEN))
                .ok()
                .filter(|k| !k.trim().is_empty()),
        }
    }
}

/// Top-level agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub endpoint: Endpoint,
    /// Directory holding `<category>.txt` documentation files.
    pub knowledge_dir: PathBuf,
    /// CSV file escalated tickets are appended to.
    pub escalation_log: PathBuf,
    /// Optional JSONL file receiving one run summary per ticket.
    pub telemetry_log: Option<PathBuf>,
    /// Wall-clock limit for a single completion call, retries included.
    pub timeout_secs: u64,
    /// Retries for transient completion errors (5xx, 429, connection resets).
    pub max_retries: u32,
    /// Ask the model for a rejection reason when the reviewer gives none.
    pub elicit_feedback: bool,
    /// Parallel tickets in `batch` mode.
    pub concurrency: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            knowledge_dir: env::var(ENV_KNOWLEDGE_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_KNOWLEDGE_DIR)),
            escalation_log: env::var(ENV_ESCALATION_LOG)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_ESCALATION_LOG)),
            telemetry_log: env::var(ENV_TELEMETRY_LOG).ok().map(PathBuf::from),
            timeout_secs: u64_from_env(ENV_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            elicit_feedback: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl AgentConfig {
    /// Defaults, overlaid with `path` when one is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.endpoint.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::invalid(format!(
                "endpoint.url must be an http(s) URL, got '{url}'"
            )));
        }
        if self.endpoint.model.trim().is_empty() {
            return Err(ConfigError::invalid("endpoint.model must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("timeout_secs must be greater than 0"));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::invalid("concurrency must be at least 1"));
        }
        if self.escalation_log.as_os_str().is_empty() {
            return Err(ConfigError::invalid("escalation_log must not be empty"));
        }
        Ok(())
    }
}

fn u64_from_env(var: &str, default: u64) -> u64 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// Check if an inference endpoint is reachable (GET `{url}/models`).
pub async fn check_endpoint(endpoint: &Endpoint) -> bool {
    let models_url = format!("{}/models", endpoint.url.trim_end_matches('/'));
    let mut request = reqwest::Client::new()
        .get(&models_url)
        .timeout(Duration::from_secs(5));
    if let Some(key) = &endpoint.api_key {
        request = request.bearer_auth(key);
    }
    match request.send().await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}
