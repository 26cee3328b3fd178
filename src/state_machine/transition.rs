//! Pure state transition function
//!
//! Given the same state, context and event it always produces the same
//! result, with no I/O.

use super::{AgentContext, AgentState, Effect, Event, ToolResult};
use crate::conversation::{Role, ToolCall};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: AgentState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: AgentState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    /// Entry point of every run: reason over the current history
    pub fn start() -> Self {
        Self::new(AgentState::initial()).with_effect(Effect::RequestLlm)
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Model kept requesting tools after {max_turns} reasoning steps")]
    TurnLimitExceeded { max_turns: u32 },
    #[error("Tool results do not match pending calls: {0}")]
    ResultMismatch(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &AgentState,
    context: &AgentContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Reasoning + non-assistant message -> reject
        (AgentState::Reasoning { .. }, Event::LlmResponse { message }) if message.role != Role::Assistant => {
            Err(TransitionError::InvalidTransition(format!(
                "Reasoning step produced a {:?} message",
                message.role
            )))
        }

        // Reasoning + final answer -> Done
        (AgentState::Reasoning { .. }, Event::LlmResponse { message }) if !message.has_tool_calls() => {
            Ok(TransitionResult::new(AgentState::Done).with_effect(Effect::append(message)))
        }

        // Reasoning + tool calls at the turn cap -> abort. The message is not
        // persisted, so stored history never holds calls without results.
        (AgentState::Reasoning { turn }, Event::LlmResponse { .. }) if *turn >= context.max_turns => {
            Err(TransitionError::TurnLimitExceeded {
                max_turns: context.max_turns,
            })
        }

        // Reasoning + tool calls -> Acting
        (AgentState::Reasoning { turn }, Event::LlmResponse { message }) => {
            let calls = message.tool_calls.clone();
            Ok(TransitionResult::new(AgentState::Acting {
                turn: *turn,
                pending: calls.clone(),
            })
            .with_effect(Effect::append(message))
            .with_effect(Effect::execute_tools(calls)))
        }

        // Acting + all results -> Reasoning (next turn)
        (AgentState::Acting { turn, pending }, Event::ToolsComplete { results }) => {
            check_results(pending, &results)?;
            Ok(TransitionResult::new(AgentState::Reasoning { turn: turn + 1 })
                .with_effects(results.into_iter().map(|r| Effect::append(r.into_message())))
                .with_effect(Effect::RequestLlm))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} with event {}",
            state.name(),
            event_name(&event)
        ))),
    }
}

/// Every pending call must get exactly one result, in emission order
fn check_results(pending: &[ToolCall], results: &[ToolResult]) -> Result<(), TransitionError> {
    if pending.len() != results.len() {
        return Err(TransitionError::ResultMismatch(format!(
            "expected {} results, got {}",
            pending.len(),
            results.len()
        )));
    }
    for (call, result) in pending.iter().zip(results) {
        if call.id != result.call_id {
            return Err(TransitionError::ResultMismatch(format!(
                "expected result for {}, got {}",
                call.id, result.call_id
            )));
        }
    }
    Ok(())
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::LlmResponse { .. } => "llm_response",
        Event::ToolsComplete { .. } => "tools_complete",
    }
}
