//! Agent runtime executor
//!
//! Runs the pure state machine to completion for one request, executing
//! each effect against the session's conversation as it is produced.

use super::traits::{LlmClient, ToolExecutor};
use super::RuntimeConfig;

use crate::conversation::{Conversation, Message, MessageMetadata, ToolCall};
use crate::llm::{LlmError, LlmRequest};
use crate::state_machine::{transition, AgentContext, Effect, Event, ToolResult, TransitionError, TransitionResult};
use crate::system_prompt::build_system_prompt;
use crate::tools::{ToolContext, ToolError};
use futures::future::try_join_all;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use thiserror::Error;

const MAX_RESPONSE_TOKENS: u32 = 8192;

/// Errors that abort an agent run
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Model invocation failed: {0}")]
    ModelInvocation(#[from] LlmError),
    #[error("Model did not respond within {0:?}")]
    ModelTimeout(Duration),
    #[error("Tool invocation failed: {0}")]
    ToolInvocation(ToolError),
    #[error("Tool {tool} did not finish within {timeout:?}")]
    ToolTimeout { tool: String, timeout: Duration },
    #[error("Model kept requesting tools after {max_turns} reasoning steps")]
    TurnLimitExceeded { max_turns: u32 },
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

impl RuntimeError {
    /// Whether the same request may succeed if sent again
    pub fn is_retryable(&self) -> bool {
        match self {
            RuntimeError::ModelInvocation(e) => e.kind.is_retryable(),
            RuntimeError::ModelTimeout(_) | RuntimeError::ToolTimeout { .. } => true,
            RuntimeError::ToolInvocation(e) => e.is_retryable(),
            RuntimeError::TurnLimitExceeded { .. }
            | RuntimeError::InvalidTransition(_) => false,
        }
    }
}

impl From<TransitionError> for RuntimeError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::TurnLimitExceeded { max_turns } => RuntimeError::TurnLimitExceeded { max_turns },
            other @ (TransitionError::ResultMismatch(_) | TransitionError::InvalidTransition(_)) => {
                RuntimeError::InvalidTransition(other.to_string())
            }
        }
    }
}

/// Generic agent runtime that can work with any LLM and tool implementations
pub struct AgentRuntime<L, T>
where
    L: LlmClient,
    T: ToolExecutor,
{
    llm_client: L,
    tool_executor: T,
    config: RuntimeConfig,
}

impl<L, T> AgentRuntime<L, T>
where
    L: LlmClient,
    T: ToolExecutor,
{
    pub fn new(llm_client: L, tool_executor: T, config: RuntimeConfig) -> Self {
        Self {
            llm_client,
            tool_executor,
            config,
        }
    }

    pub fn model_id(&self) -> &str {
        self.llm_client.model_id()
    }

    pub fn config(&self) -> RuntimeConfig {
        self.config
    }

    /// Drive the graph from `Reasoning` until `Done`.
    ///
    /// Every produced message is appended to `conversation` as soon as its
    /// effect runs, so on error the history up to the failure point stays.
    /// Returns the final assistant message.
    pub async fn run(&self, conversation: &mut Conversation, ctx: &ToolContext) -> Result<Message, RuntimeError> {
        if conversation.is_empty() {
            return Err(RuntimeError::InvalidTransition("nothing to reason over".to_string()));
        }

        let agent_ctx = AgentContext::new(ctx.session_id.clone(), self.config.max_turns);
        let start = TransitionResult::start();
        let mut state = start.new_state;
        let mut effects: VecDeque<Effect> = start.effects.into();

        tracing::info!(session_id = %agent_ctx.session_id, history_len = conversation.len(), "Starting agent run");

        loop {
            let mut next_event = None;
            while let Some(effect) = effects.pop_front() {
                if let Some(event) = self.execute_effect(effect, conversation, ctx).await? {
                    next_event = Some(event);
                }
            }

            let Some(event) = next_event else {
                break;
            };

            let result = match transition(&state, &agent_ctx, event) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(session_id = %agent_ctx.session_id, state = state.name(), error = %e, "Agent run aborted");
                    return Err(e.into());
                }
            };
            tracing::debug!(
                session_id = %agent_ctx.session_id,
                from = state.name(),
                to = result.new_state.name(),
                turn = result.new_state.turn(),
                "State transition"
            );
            state = result.new_state;
            effects.extend(result.effects);
        }

        if !state.is_terminal() {
            return Err(RuntimeError::InvalidTransition(format!(
                "run stopped in {} state",
                state.name()
            )));
        }

        let last = conversation
            .last_assistant()
            .cloned()
            .ok_or_else(|| RuntimeError::InvalidTransition("run finished without an answer".to_string()))?;

        tracing::info!(session_id = %agent_ctx.session_id, history_len = conversation.len(), "Agent run complete");
        Ok(last)
    }

    async fn execute_effect(
        &self,
        effect: Effect,
        conversation: &mut Conversation,
        ctx: &ToolContext,
    ) -> Result<Option<Event>, RuntimeError> {
        match effect {
            Effect::AppendMessage(message) => {
                conversation.push(message);
                Ok(None)
            }
            Effect::RequestLlm => {
                let message = self.reason(conversation.messages()).await?;
                Ok(Some(Event::LlmResponse { message }))
            }
            Effect::ExecuteTools { calls } => match self.act(&calls, ctx).await {
                Ok(results) => Ok(Some(Event::ToolsComplete { results })),
                Err(e) => {
                    // The assistant message with these calls is already stored;
                    // answer every one so the next run reasons over a closed turn
                    for call in &calls {
                        let result = ToolResult::error(&call.id, format!("Tool call did not complete: {e}"));
                        conversation.push(result.into_message());
                    }
                    Err(e)
                }
            },
        }
    }

    /// Reasoning step: system directive plus history in, one assistant message out.
    /// The message carries the call latency and token usage as metadata.
    pub async fn reason(&self, history: &[Message]) -> Result<Message, RuntimeError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(build_system_prompt());
        messages.extend_from_slice(history);

        let request = LlmRequest {
            messages,
            tools: self.tool_executor.definitions(),
            max_tokens: Some(MAX_RESPONSE_TOKENS),
        };

        let started = Instant::now();
        let response = tokio::time::timeout(self.config.llm_timeout, self.llm_client.complete(&request))
            .await
            .map_err(|_| RuntimeError::ModelTimeout(self.config.llm_timeout))??;
        let latency_ms = round_ms(started.elapsed());

        let usage = response.usage;
        Ok(response.into_message().with_metadata(MessageMetadata {
            latency_ms,
            usage: Some(usage),
        }))
    }

    /// Invoke every call concurrently. Results come back in emission order.
    pub async fn act(&self, calls: &[ToolCall], ctx: &ToolContext) -> Result<Vec<ToolResult>, RuntimeError> {
        let result = try_join_all(calls.iter().map(|call| self.invoke(call, ctx.clone()))).await;
        if result.is_err() {
            // Siblings still in flight were dropped; let anything they spawned wind down
            ctx.cancel.cancel();
        }
        result
    }

    async fn invoke(&self, call: &ToolCall, ctx: ToolContext) -> Result<ToolResult, RuntimeError> {
        let started = Instant::now();
        let outcome = tokio::time::timeout(
            self.config.tool_timeout,
            self.tool_executor.execute(&call.name, call.arguments.clone(), ctx),
        )
        .await;
        let duration_ms = round_ms(started.elapsed());

        match outcome {
            Ok(Ok(output)) => {
                tracing::info!(tool = %call.name, call_id = %call.id, duration_ms, success = output.success, "Tool executed");
                Ok(if output.success {
                    ToolResult::success(&call.id, output.output)
                } else {
                    ToolResult::error(&call.id, output.output)
                })
            }
            Ok(Err(e @ ToolError::UnknownTool(_))) => {
                tracing::warn!(tool = %call.name, call_id = %call.id, "Model requested an unregistered tool");
                Ok(ToolResult::error(&call.id, e.to_string()))
            }
            Ok(Err(e)) => {
                tracing::error!(tool = %call.name, call_id = %call.id, duration_ms, error = %e, "Tool failed");
                Err(RuntimeError::ToolInvocation(e))
            }
            Err(_) => {
                tracing::error!(tool = %call.name, call_id = %call.id, duration_ms, "Tool timed out");
                Err(RuntimeError::ToolTimeout {
                    tool: call.name.clone(),
                    timeout: self.config.tool_timeout,
                })
            }
        }
    }
}

/// Milliseconds rounded to two decimals
fn round_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100_000.0).round() / 100.0
}
