//! API request and response types

use crate::conversation::Usage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Omitted or unknown ids create a new session
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

/// Final answer of one agent run
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub response: String,
    pub usage: Option<Usage>,
    pub latency_ms: Option<f64>,
}

/// Request for entity recommendations on an uploaded document
#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    /// Must name an existing session
    pub session_id: String,
    /// Optional narrowing of what to recommend
    #[serde(default)]
    pub prompt: String,
    /// Opaque reference of the uploaded document
    pub artifact: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub session_id: String,
    pub recommendations: String,
}

/// Response for explicit session creation
#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    pub session_id: String,
}

/// Read-only view of a session
#[derive(Debug, Serialize)]
pub struct SessionInfoResponse {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
    pub last_artifact: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Whether sending the same request again may succeed
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, retryable: bool) -> Self {
        Self {
            error: message.into(),
            retryable,
        }
    }
}
