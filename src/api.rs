//! HTTP API for docsense

mod handlers;
mod types;

pub use handlers::create_router;

use crate::runtime::SharedRuntime;
use crate::session::SessionRegistry;
use crate::tools::ArtifactAnalyzer;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub runtime: Arc<SharedRuntime>,
    /// Direct document analysis for `/recommend`, outside any agent run
    pub analyzer: Arc<dyn ArtifactAnalyzer>,
}

impl AppState {
    pub fn new(runtime: SharedRuntime, analyzer: Arc<dyn ArtifactAnalyzer>) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new()),
            runtime: Arc::new(runtime),
            analyzer,
        }
    }
}
