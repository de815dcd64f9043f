//! Completion port implementations.
//!
//! The engine never knows which one it is talking to: `--mock` swaps in
//! [`CannedCompletion`] at construction time.

pub mod canned;
pub mod rig_completion;

use std::sync::Arc;

use anyhow::Result;
use triage_coordination::CompletionPort;

use crate::config::AgentConfig;

pub use canned::CannedCompletion;
pub use rig_completion::RigCompletion;

/// Live client for `config.endpoint`, or canned responses when `mock` is set.
pub fn build_completion(config: &AgentConfig, mock: bool) -> Result<Arc<dyn CompletionPort>> {
    if mock {
        return Ok(Arc::new(CannedCompletion::new()));
    }
    Ok(Arc::new(RigCompletion::new(config)?))
}
