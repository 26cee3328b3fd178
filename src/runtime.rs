//! Runtime for executing agent runs
//!
//! The state machine decides, the runtime performs: model calls, tool
//! calls and history appends all happen here.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{AgentRuntime, RuntimeError};
pub use traits::*;

use crate::state_machine::state::DEFAULT_MAX_TURNS;
use std::sync::Arc;
use std::time::Duration;

/// Runtime shared by request handlers, with the I/O seams erased
pub type SharedRuntime = AgentRuntime<Arc<dyn LlmClient>, Arc<dyn ToolExecutor>>;

/// Limits applied to every agent run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Reasoning steps allowed per request
    pub max_turns: u32,
    /// Deadline for one model call
    pub llm_timeout: Duration,
    /// Deadline for one tool call
    pub tool_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            llm_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(180),
        }
    }
}
