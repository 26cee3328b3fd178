//! Tool implementations
//!
//! Tools are stateless capabilities looked up by name. All per-call context
//! arrives through [`ToolContext`].

mod document_analysis;

pub use document_analysis::{ArtifactAnalyzer, DocumentAnalysisTool, LlmArtifactAnalyzer, TOOL_NAME};

use crate::llm::{LlmError, ToolDefinition};
use crate::session::ScratchHandle;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Result from tool execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    /// Failure the model can see and react to on its next turn
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
        }
    }
}

/// Errors raised while dispatching or running a tool
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Tool {tool} failed: {message}")]
    Invocation { tool: String, message: String },
    /// The model behind a tool failed; keeps the provider's classification
    #[error("Tool {tool} failed: {source}")]
    Provider {
        tool: String,
        #[source]
        source: LlmError,
    },
}

impl ToolError {
    pub fn invocation(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::Invocation {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn provider(tool: impl Into<String>, source: LlmError) -> Self {
        ToolError::Provider {
            tool: tool.into(),
            source,
        }
    }

    /// Whether the same call may succeed if the request is sent again
    pub fn is_retryable(&self) -> bool {
        match self {
            ToolError::Provider { source, .. } => source.kind.is_retryable(),
            ToolError::UnknownTool(_) | ToolError::Invocation { .. } => false,
        }
    }
}

/// All context needed for a tool invocation.
///
/// Created fresh for each agent run.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Cancellation signal for long-running operations
    pub cancel: CancellationToken,

    /// The session this tool is executing within
    pub session_id: String,

    scratch: ScratchHandle,
}

impl ToolContext {
    pub fn new(cancel: CancellationToken, session_id: impl Into<String>, scratch: ScratchHandle) -> Self {
        Self {
            cancel,
            session_id: session_id.into(),
            scratch,
        }
    }

    /// Scratch values of the owning session
    pub fn scratch(&self) -> &ScratchHandle {
        &self.scratch
    }
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;

    /// Tool description for LLM
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute the tool.
    ///
    /// Malformed input should come back as [`ToolOutput::error`] so the model
    /// can correct itself. `Err` is reserved for failures of the underlying
    /// capability, which abort the current request.
    async fn run(&self, input: Value, ctx: ToolContext) -> Result<ToolOutput, ToolError>;
}

/// Static mapping from tool name to capability
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard registry with the document analysis capability
    pub fn standard(analyzer: Arc<dyn ArtifactAnalyzer>) -> Self {
        Self::new().with_tool(Arc::new(DocumentAnalysisTool::new(analyzer)))
    }

    /// Add a capability; a later entry with the same name replaces the earlier one
    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    /// Get all tool definitions for LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name with context
    pub async fn execute(&self, name: &str, input: Value, ctx: ToolContext) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.run(input, ctx).await
    }
}
