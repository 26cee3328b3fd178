//! docsense - conversational document analysis agent
//!
//! An HTTP service that runs a tool-calling LLM agent over per-session
//! conversation history.

mod api;
mod config;
mod conversation;
mod llm;
mod runtime;
mod session;
mod state_machine;
mod system_prompt;
mod tools;

use api::{create_router, AppState};
use config::Config;
use llm::ModelRegistry;
use runtime::{AgentRuntime, LlmClient, RegistryLlmClient, ToolExecutor, ToolRegistryExecutor};
use std::sync::Arc;
use tools::{ArtifactAnalyzer, LlmArtifactAnalyzer, ToolRegistry};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docsense=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env();

    // Initialize LLM registry
    let llm_registry = Arc::new(ModelRegistry::new(&config.llm));
    if llm_registry.has_models() {
        tracing::info!(
            models = ?llm_registry.available_models(),
            default = %llm_registry.default_model_id(),
            "LLM registry initialized"
        );
    } else {
        tracing::warn!("No LLM API keys configured. Set GEMINI_API_KEY or LLM_GATEWAY.");
    }

    let model_id = llm_registry.default_model_id().to_string();
    let analyzer: Arc<dyn ArtifactAnalyzer> = Arc::new(LlmArtifactAnalyzer::new(llm_registry.clone(), model_id.clone()));
    let llm_client: Arc<dyn LlmClient> = Arc::new(RegistryLlmClient::new(llm_registry, model_id));
    let tool_executor: Arc<dyn ToolExecutor> =
        Arc::new(ToolRegistryExecutor::new(ToolRegistry::standard(analyzer.clone())));

    let runtime = AgentRuntime::new(llm_client, tool_executor, config.runtime);
    tracing::info!(
        model = %runtime.model_id(),
        max_turns = config.runtime.max_turns,
        llm_timeout_secs = config.runtime.llm_timeout.as_secs(),
        tool_timeout_secs = config.runtime.tool_timeout.as_secs(),
        "Agent runtime configured"
    );
    let state = AppState::new(runtime, analyzer);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = config.addr();
    tracing::info!("docsense listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
