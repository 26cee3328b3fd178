//! Gemini `generateContent` client

use super::types::{LlmRequest, LlmResponse, Usage};
use super::{LlmError, LlmService};
use crate::conversation::{ContentPart, Message, MessageContent, Role, ToolCall};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

const DIRECT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiModel {
    Gemini3Pro,
    Gemini3Flash,
}

impl GeminiModel {
    /// Every model the service can be configured with, preferred first
    pub const ALL: [GeminiModel; 2] = [GeminiModel::Gemini3Flash, GeminiModel::Gemini3Pro];

    pub fn api_name(self) -> &'static str {
        match self {
            GeminiModel::Gemini3Pro => "gemini-3-pro-preview",
            GeminiModel::Gemini3Flash => "gemini-3-flash-preview",
        }
    }

    pub fn model_id(self) -> &'static str {
        match self {
            GeminiModel::Gemini3Pro => "gemini-3-pro",
            GeminiModel::Gemini3Flash => "gemini-3-flash",
        }
    }
}

/// One Gemini model behind `generateContent`
pub struct GeminiService {
    client: Client,
    /// None when a gateway injects credentials
    api_key: Option<String>,
    url: String,
    model_id: String,
}

impl GeminiService {
    pub fn new(api_key: Option<String>, model: GeminiModel, gateway: Option<&str>) -> Result<Self, LlmError> {
        let url = match gateway {
            Some(gw) => format!(
                "{}/gemini/v1beta/models/{}:generateContent",
                gw.trim_end_matches('/'),
                model.api_name()
            ),
            None => format!("{DIRECT_BASE_URL}/models/{}:generateContent", model.api_name()),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            url,
            model_id: model.model_id().to_string(),
        })
    }

    fn translate_request(request: &LlmRequest) -> GeminiRequest {
        let system_text = request
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(Message::text)
            .collect::<Vec<_>>()
            .join("\n\n");

        let system_instruction = if system_text.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text { text: system_text }],
            })
        };

        // Gemini answers function calls by name, so remember which name each call id had
        let mut call_names: HashMap<&str, &str> = HashMap::new();
        let mut contents: Vec<GeminiContent> = Vec::new();
        let mut last_was_tool_result = false;

        for msg in &request.messages {
            match msg.role {
                Role::System => continue,
                Role::User => {
                    let parts = content_parts(&msg.content);
                    if !parts.is_empty() {
                        contents.push(GeminiContent {
                            role: Some("user".to_string()),
                            parts,
                        });
                    }
                    last_was_tool_result = false;
                }
                Role::Assistant => {
                    let mut parts = content_parts(&msg.content);
                    for call in &msg.tool_calls {
                        call_names.insert(call.id.as_str(), call.name.as_str());
                        parts.push(GeminiPart::FunctionCall {
                            function_call: GeminiFunctionCall {
                                id: Some(call.id.clone()),
                                name: call.name.clone(),
                                args: call.arguments.clone(),
                            },
                            thought_signature: call.thought_signature.clone(),
                        });
                    }
                    if !parts.is_empty() {
                        contents.push(GeminiContent {
                            role: Some("model".to_string()),
                            parts,
                        });
                    }
                    last_was_tool_result = false;
                }
                Role::ToolResult => {
                    let call_id = msg.tool_call_id.clone().unwrap_or_default();
                    let name = call_names
                        .get(call_id.as_str())
                        .map_or_else(|| "function".to_string(), |n| (*n).to_string());
                    let part = GeminiPart::FunctionResponse {
                        function_response: GeminiFunctionResponse {
                            id: Some(call_id),
                            name,
                            response: serde_json::json!({
                                "result": msg.text(),
                                "error": msg.is_error
                            }),
                        },
                    };
                    // All responses for one turn travel in a single content entry
                    match contents.last_mut() {
                        Some(last) if last_was_tool_result => last.parts.push(part),
                        _ => contents.push(GeminiContent {
                            role: Some("user".to_string()),
                            parts: vec![part],
                        }),
                    }
                    last_was_tool_result = true;
                }
            }
        }

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(vec![GeminiTool {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.input_schema.clone(),
                    })
                    .collect(),
            }])
        };

        GeminiRequest {
            contents,
            system_instruction,
            tools,
            generation_config: request.max_tokens.map(|t| GeminiGenerationConfig {
                max_output_tokens: Some(t),
            }),
        }
    }

    fn normalize_response(resp: GeminiResponse) -> Result<LlmResponse, LlmError> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No candidates in response"))?;

        let mut parts = Vec::new();
        let mut tool_calls = Vec::new();

        for part in candidate.content.parts {
            match part {
                GeminiPart::Text { text } => {
                    if !text.is_empty() {
                        parts.push(ContentPart::text(text));
                    }
                }
                GeminiPart::FunctionCall {
                    function_call,
                    thought_signature,
                } => {
                    let id = function_call
                        .id
                        .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
                    let mut call = ToolCall::new(id, function_call.name, function_call.args);
                    call.thought_signature = thought_signature;
                    tool_calls.push(call);
                }
                _ => {}
            }
        }

        let end_turn = candidate.finish_reason.is_some_and(|r| r == "STOP") && tool_calls.is_empty();
        let usage = Usage {
            input_tokens: u64::from(resp.usage_metadata.prompt_token_count),
            output_tokens: u64::from(resp.usage_metadata.candidates_token_count),
            total_tokens: u64::from(resp.usage_metadata.total_token_count),
        };

        Ok(LlmResponse {
            content: MessageContent::PartList(parts),
            tool_calls,
            end_turn,
            usage,
        })
    }
}

/// Resolve an opaque artifact reference into a Gemini file URI
fn file_uri(reference: &str) -> String {
    if reference.starts_with("https://") || reference.starts_with("gs://") {
        reference.to_string()
    } else if reference.starts_with("files/") {
        format!("{DIRECT_BASE_URL}/{reference}")
    } else {
        format!("{DIRECT_BASE_URL}/files/{reference}")
    }
}

fn content_parts(content: &MessageContent) -> Vec<GeminiPart> {
    match content {
        MessageContent::PlainText(text) if text.is_empty() => Vec::new(),
        MessageContent::PlainText(text) => vec![GeminiPart::Text { text: text.clone() }],
        MessageContent::PartList(parts) => parts
            .iter()
            .filter_map(|p| match p.kind.as_str() {
                "text" => Some(GeminiPart::Text {
                    text: p.text.clone(),
                }),
                "file" => Some(GeminiPart::FileData {
                    file_data: GeminiFileData {
                        file_uri: file_uri(&p.text),
                    },
                }),
                _ => None,
            })
            .collect(),
    }
}

#[async_trait]
impl LlmService for GeminiService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let gemini_request = Self::translate_request(request);

        let mut call = self.client.post(&self.url).json(&gemini_request);
        if let Some(key) = &self.api_key {
            call = call.query(&[("key", key)]);
        }

        let response = call.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map_or(body, |r| r.error.message);
            return Err(LlmError::from_status(status.as_u16(), &message));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::unknown(format!("Failed to parse response: {e} - body: {body}")))?;

        Self::normalize_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn transport_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() || e.is_connect() || e.is_body() {
        LlmError::network(e.to_string())
    } else {
        LlmError::unknown(format!("Gemini request failed: {e}"))
    }
}

// Wire format of generateContent

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
        /// Gemini 3 rejects follow-up turns whose function calls lack this
        #[serde(rename = "thoughtSignature", default, skip_serializing_if = "Option::is_none")]
        thought_signature: Option<String>,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: GeminiFunctionResponse,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: GeminiFileData,
    },
    /// Part kinds this client does not use, such as inline data
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFileData {
    file_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: GeminiUsageMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: GeminiContent,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
