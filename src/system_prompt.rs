//! System directive injected at the head of every reasoning step

use crate::conversation::Message;

/// Base directive establishing the agent's role and tool discipline
const BASE_PROMPT: &str = r"You are an AI assistant that helps users build document extraction models.

Rules:
- Only call tools when the user has referenced a concrete document.
- If no document has been provided, ask the user for one.
- Never make up the contents of a document you have not analyzed.";

/// Build the system message. It is never persisted in session history.
pub fn build_system_prompt() -> Message {
    Message::system(BASE_PROMPT)
}
