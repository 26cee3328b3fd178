//! Common types for LLM interactions

use crate::conversation::{Message, MessageContent, ToolCall};

pub use crate::conversation::Usage;

/// LLM request
///
/// `messages` starts with the system directive followed by the persisted
/// history, in order.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: Option<u32>,
}

/// Tool definition advertised to the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: MessageContent,
    pub tool_calls: Vec<ToolCall>,
    pub end_turn: bool,
    pub usage: Usage,
}

#[cfg(test)]
impl LlmResponse {
    /// Plain text answer with no tool calls
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: MessageContent::PlainText(text.into()),
            tool_calls: Vec::new(),
            end_turn: true,
            usage: Usage::default(),
        }
    }

    /// Response that only requests tools
    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: MessageContent::default(),
            tool_calls,
            end_turn: false,
            usage: Usage::default(),
        }
    }

    #[must_use]
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }
}

impl LlmResponse {
    /// Convert into an assistant message (metadata is attached by the caller)
    pub fn into_message(self) -> Message {
        Message::assistant(self.content, self.tool_calls)
    }
}
