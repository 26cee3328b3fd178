//! HTTP request handlers

use super::types::{
    ChatRequest, ChatResponse, ErrorResponse, HealthResponse, RecommendRequest, RecommendResponse,
    SessionCreatedResponse, SessionInfoResponse,
};
use super::AppState;
use crate::conversation::Message;
use crate::llm::LlmError;
use crate::runtime::RuntimeError;
use crate::tools::ToolContext;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/recommend", post(recommend))
        .route("/session", post(create_session))
        .route("/session/:id", get(get_session))
        .route("/health", get(health))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Chat
// ============================================================

async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Result<Json<ChatResponse>, AppError> {
    if req.message.trim().is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }

    let requested = req.session_id.as_deref().filter(|id| !id.trim().is_empty());
    let (session_id, entry) = state.sessions.get_or_create(requested).await;

    // Held for the whole run: requests for the same session queue here
    let mut conversation = entry.lock().await;
    conversation.push(Message::user(req.message));

    // Client disconnects drop this future; the guard cancels in-flight tools
    let cancel = CancellationToken::new();
    let _cancel_guard = cancel.clone().drop_guard();
    let ctx = ToolContext::new(cancel, session_id.clone(), entry.scratch().clone());

    let answer = state.runtime.run(&mut conversation, &ctx).await.map_err(|e| {
        tracing::error!(session_id = %session_id, error = %e, history_len = conversation.len(), "Chat request failed");
        AppError::from(e)
    })?;
    drop(conversation);

    let metadata = answer.metadata;
    Ok(Json(ChatResponse {
        session_id,
        response: answer.text(),
        usage: metadata.and_then(|m| m.usage),
        latency_ms: metadata.map(|m| m.latency_ms),
    }))
}

// ============================================================
// Recommendations
// ============================================================

/// One-shot analysis of an uploaded document. Leaves the session's
/// conversation history untouched.
async fn recommend(
    State(state): State<AppState>,
    Json(req): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, AppError> {
    if req.artifact.trim().is_empty() {
        return Err(AppError::BadRequest("artifact must not be empty".to_string()));
    }
    let entry = state
        .sessions
        .get(&req.session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {}", req.session_id)))?;

    let deadline = state.runtime.config().tool_timeout;
    let started = Instant::now();
    let outcome = tokio::time::timeout(deadline, state.analyzer.analyze(&req.artifact, Some(req.prompt.as_str()))).await;
    let latency_ms = started.elapsed().as_millis();

    let recommendations = match outcome {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::warn!(session_id = %req.session_id, artifact = %req.artifact, %latency_ms, error = %e, "Recommendation failed");
            return Err(e.into());
        }
        Err(_) => {
            tracing::warn!(session_id = %req.session_id, artifact = %req.artifact, %latency_ms, "Recommendation timed out");
            return Err(AppError::Unavailable(format!(
                "Document analysis did not finish within {deadline:?}"
            )));
        }
    };

    entry.scratch().record_artifact(&req.artifact);
    tracing::info!(session_id = %req.session_id, artifact = %req.artifact, %latency_ms, "Recommendations produced");

    Ok(Json(RecommendResponse {
        session_id: req.session_id,
        recommendations,
    }))
}

// ============================================================
// Sessions
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<SessionCreatedResponse> {
    let (session_id, _) = state.sessions.get_or_create(None).await;
    Json(SessionCreatedResponse { session_id })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionInfoResponse>, AppError> {
    let entry = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))?;

    Ok(Json(SessionInfoResponse {
        session_id: entry.id().to_string(),
        created_at: entry.created_at(),
        message_count: entry.message_count(),
        last_artifact: entry.scratch().snapshot().last_artifact,
    }))
}

// ============================================================
// Health / Version
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.sessions.len().await,
    })
}

async fn get_version() -> &'static str {
    concat!("docsense ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    /// Transient failure; the client may retry
    Unavailable(String),
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(e: RuntimeError) -> Self {
        if e.is_retryable() {
            AppError::Unavailable(e.to_string())
        } else {
            AppError::Internal(e.to_string())
        }
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        if e.kind.is_retryable() {
            AppError::Unavailable(e.to_string())
        } else {
            AppError::Internal(e.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message, status == StatusCode::SERVICE_UNAVAILABLE));
        (status, body).into_response()
    }
}
