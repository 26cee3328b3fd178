//! Seams between the agent loop and the outside world
//!
//! The executor only sees these two traits, so scenario tests swap in the
//! mocks from `runtime::testing` while production wires the Gemini registry
//! and the tool registry.

use crate::llm::{LlmError, LlmRequest, LlmResponse, ModelRegistry, ToolDefinition};
use crate::tools::{ToolContext, ToolError, ToolOutput, ToolRegistry};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// The reasoning backend
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    fn model_id(&self) -> &str;
}

/// Dispatches tool calls by name
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Names nobody registered yield [`ToolError::UnknownTool`]
    async fn execute(&self, name: &str, input: Value, ctx: ToolContext) -> Result<ToolOutput, ToolError>;

    /// Advertised to the model on every reasoning step
    fn definitions(&self) -> Vec<ToolDefinition>;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        T::complete(self, request).await
    }

    fn model_id(&self) -> &str {
        T::model_id(self)
    }
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn execute(&self, name: &str, input: Value, ctx: ToolContext) -> Result<ToolOutput, ToolError> {
        T::execute(self, name, input, ctx).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        T::definitions(self)
    }
}

/// Resolves a model id against the registry on every call, falling back
/// to the registry default
pub struct RegistryLlmClient {
    registry: Arc<ModelRegistry>,
    model_id: String,
}

impl RegistryLlmClient {
    pub fn new(registry: Arc<ModelRegistry>, model_id: impl Into<String>) -> Self {
        Self {
            registry,
            model_id: model_id.into(),
        }
    }
}

#[async_trait]
impl LlmClient for RegistryLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let Some(service) = self.registry.get(&self.model_id).or_else(|| self.registry.default()) else {
            return Err(LlmError::auth("No LLM configured. Set GEMINI_API_KEY or LLM_GATEWAY."));
        };
        service.complete(request).await
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

pub struct ToolRegistryExecutor(ToolRegistry);

impl ToolRegistryExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self(registry)
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistryExecutor {
    async fn execute(&self, name: &str, input: Value, ctx: ToolContext) -> Result<ToolOutput, ToolError> {
        self.0.execute(name, input, ctx).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.0.definitions()
    }
}
