//! Language model access
//!
//! The reasoning step and the document analyzer both talk to Gemini through
//! [`LlmService`]; the registry hands out services wrapped in
//! [`LoggingService`] so every call is traced the same way.

mod error;
mod gemini;
mod registry;
mod types;

pub use error::{LlmError, LlmErrorKind};
pub use gemini::{GeminiModel, GeminiService};
pub use registry::{LlmConfig, ModelRegistry};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// A model that can answer a request
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Registry id of the model (e.g. "gemini-3-flash")
    fn model_id(&self) -> &str;
}

/// Traces every call of the wrapped service: latency, token usage and
/// whether a failure is worth retrying
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let started = Instant::now();
        let result = self.inner.complete(request).await;
        let latency_ms = started.elapsed().as_millis();
        let model = self.inner.model_id();

        match &result {
            Ok(response) => tracing::info!(
                model,
                %latency_ms,
                messages = request.messages.len(),
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                total_tokens = response.usage.total_tokens,
                tool_calls = response.tool_calls.len(),
                end_turn = response.end_turn,
                "Model call completed"
            ),
            Err(e) => tracing::warn!(
                model,
                %latency_ms,
                kind = ?e.kind,
                retryable = e.kind.is_retryable(),
                error = %e.message,
                "Model call failed"
            ),
        }

        result
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
