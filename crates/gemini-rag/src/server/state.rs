//! Application state for the RAG server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::engine::RetrievalEngine;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Retrieval engine shared by every handler
    engine: Arc<RetrievalEngine>,
}

impl AppState {
    /// Create application state around an existing engine
    pub fn new(config: RagConfig, engine: Arc<RetrievalEngine>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, engine }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the retrieval engine
    pub fn engine(&self) -> &Arc<RetrievalEngine> {
        &self.inner.engine
    }
}
