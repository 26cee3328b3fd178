//! Agent state types

use crate::conversation::ToolCall;
use serde::Serialize;

/// Default cap on reasoning steps per request
pub const DEFAULT_MAX_TURNS: u32 = 8;

/// Orchestration state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentState {
    /// Model request pending for reasoning step `turn` (1-based)
    Reasoning { turn: u32 },

    /// Tool calls from reasoning step `turn` awaiting results, in emission order
    Acting { turn: u32, pending: Vec<ToolCall> },

    /// Final answer produced
    Done,
}

impl AgentState {
    pub fn initial() -> Self {
        AgentState::Reasoning { turn: 1 }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Done)
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            AgentState::Reasoning { .. } => "reasoning",
            AgentState::Acting { .. } => "acting",
            AgentState::Done => "done",
        }
    }

    /// Reasoning step in progress, if any
    pub fn turn(&self) -> Option<u32> {
        match self {
            AgentState::Reasoning { turn } | AgentState::Acting { turn, .. } => Some(*turn),
            AgentState::Done => None,
        }
    }
}

impl Default for AgentState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Context for one agent run (immutable configuration)
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub session_id: String,
    /// Maximum reasoning steps before the run is aborted
    pub max_turns: u32,
}

impl AgentContext {
    pub fn new(session_id: impl Into<String>, max_turns: u32) -> Self {
        Self {
            session_id: session_id.into(),
            max_turns: max_turns.max(1),
        }
    }
}
