//! Document analysis tool - recommends extractable entities and tables
//!
//! The artifact itself is never handled here; the tool only forwards an
//! opaque reference to an [`ArtifactAnalyzer`].

use super::{Tool, ToolContext, ToolError, ToolOutput};
use crate::conversation::{ContentPart, Message, MessageContent};
use crate::llm::{LlmError, LlmRequest, ModelRegistry};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

pub const TOOL_NAME: &str = "analyze_document_for_entities";

const ANALYSIS_PROMPT: &str = "You are an AI assistant who will recommend entity and table names from the document that was uploaded.

Example:
\"Hey, from the document you uploaded here are some entities that can be extracted:
- InvoiceNumber
- CustomerName
- InvoiceDate

If you want to extract any entities in particular please let me know.\"

Please follow the above example. List repeating groups such as LineItems as tables.";

/// External capability that analyzes a previously uploaded artifact
#[async_trait]
pub trait ArtifactAnalyzer: Send + Sync {
    /// Analyze the artifact and return the raw textual findings.
    /// `instruction` narrows what the caller is interested in.
    async fn analyze(&self, artifact: &str, instruction: Option<&str>) -> Result<String, LlmError>;
}

/// Analyzer backed by a multimodal model from the registry
pub struct LlmArtifactAnalyzer {
    registry: Arc<ModelRegistry>,
    model_id: String,
}

impl LlmArtifactAnalyzer {
    pub fn new(registry: Arc<ModelRegistry>, model_id: impl Into<String>) -> Self {
        Self {
            registry,
            model_id: model_id.into(),
        }
    }
}

#[async_trait]
impl ArtifactAnalyzer for LlmArtifactAnalyzer {
    async fn analyze(&self, artifact: &str, instruction: Option<&str>) -> Result<String, LlmError> {
        let llm = self
            .registry
            .get(&self.model_id)
            .or_else(|| self.registry.default())
            .ok_or_else(|| LlmError::auth("No LLM available for document analysis"))?;

        let request = LlmRequest {
            messages: vec![Message {
                content: MessageContent::PartList(analysis_parts(artifact, instruction)),
                ..Message::user("")
            }],
            tools: Vec::new(),
            max_tokens: None,
        };

        let response = llm.complete(&request).await?;
        Ok(response.content.text())
    }
}

fn analysis_parts(artifact: &str, instruction: Option<&str>) -> Vec<ContentPart> {
    let mut parts = vec![ContentPart::text(ANALYSIS_PROMPT)];
    if let Some(instruction) = instruction.map(str::trim).filter(|i| !i.is_empty()) {
        parts.push(ContentPart::text(instruction));
    }
    parts.push(ContentPart {
        kind: "file".to_string(),
        text: artifact.to_string(),
    });
    parts
}

/// Tool exposing the artifact analyzer to the model
pub struct DocumentAnalysisTool {
    analyzer: Arc<dyn ArtifactAnalyzer>,
}

impl DocumentAnalysisTool {
    pub fn new(analyzer: Arc<dyn ArtifactAnalyzer>) -> Self {
        Self { analyzer }
    }
}

#[derive(Debug, Deserialize)]
struct DocumentAnalysisInput {
    artifact: String,
}

#[async_trait]
impl Tool for DocumentAnalysisTool {
    fn name(&self) -> &'static str {
        TOOL_NAME
    }

    fn description(&self) -> String {
        "Analyzes a previously uploaded document and recommends extractable entities and tables. Only call this when the user has referenced a concrete document.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["artifact"],
            "properties": {
                "artifact": {
                    "type": "string",
                    "description": "Reference of the uploaded document to analyze"
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> Result<ToolOutput, ToolError> {
        let input: DocumentAnalysisInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return Ok(ToolOutput::error(format!("Invalid input: {e}"))),
        };
        if input.artifact.trim().is_empty() {
            return Ok(ToolOutput::error("Invalid input: artifact reference is empty"));
        }

        let start = Instant::now();
        let result = tokio::select! {
            r = self.analyzer.analyze(&input.artifact, None) => r.map_err(|e| ToolError::provider(TOOL_NAME, e)),
            () = ctx.cancel.cancelled() => Err(ToolError::invocation(TOOL_NAME, "cancelled")),
        };
        let latency_ms = start.elapsed().as_millis();

        match result {
            Ok(text) => {
                tracing::info!(
                    tool = TOOL_NAME,
                    session_id = %ctx.session_id,
                    artifact = %input.artifact,
                    latency_ms = %latency_ms,
                    "Document analysis completed"
                );
                ctx.scratch().record_artifact(&input.artifact);
                Ok(ToolOutput::success(text))
            }
            Err(e) => {
                tracing::warn!(
                    tool = TOOL_NAME,
                    session_id = %ctx.session_id,
                    artifact = %input.artifact,
                    latency_ms = %latency_ms,
                    retryable = e.is_retryable(),
                    error = %e,
                    "Document analysis failed"
                );
                Err(e)
            }
        }
    }
}
