//! HTTP API for chat sessions

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::llm::ModelRegistry;
use crate::runtime::{registry_factory, SessionManager};
use crate::session::SessionConfig;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub llm_registry: Arc<ModelRegistry>,
}

impl AppState {
    pub fn new(llm_registry: Arc<ModelRegistry>, config: SessionConfig) -> Self {
        let factory = registry_factory(llm_registry.clone());
        Self {
            sessions: Arc::new(SessionManager::new(factory, config)),
            llm_registry,
        }
    }
}
