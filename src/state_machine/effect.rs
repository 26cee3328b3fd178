//! Effects produced by state transitions

use crate::conversation::{Message, ToolCall};

/// Effects to be executed after state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Append a message to the session history
    AppendMessage(Message),

    /// Run the reasoning step over the current history
    RequestLlm,

    /// Execute every call; results must come back in the same order
    ExecuteTools { calls: Vec<ToolCall> },
}

impl Effect {
    pub fn append(message: Message) -> Self {
        Effect::AppendMessage(message)
    }

    pub fn execute_tools(calls: Vec<ToolCall>) -> Self {
        Effect::ExecuteTools { calls }
    }
}
