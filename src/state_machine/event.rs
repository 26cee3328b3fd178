//! Events that drive the agent state machine

use crate::conversation::Message;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// The reasoning step produced an assistant message
    LlmResponse { message: Message },

    /// Every pending tool call has a result, in the order the calls were emitted
    ToolsComplete { results: Vec<ToolResult> },
}

/// Output of one tool call, keyed by the call it answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub call_id: String,
    pub output: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            output: output.into(),
            is_error: false,
        }
    }

    pub fn error(call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            output: message.into(),
            is_error: true,
        }
    }

    pub fn into_message(self) -> Message {
        Message::tool_result(self.call_id, self.output, self.is_error)
    }
}
