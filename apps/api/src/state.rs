use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::CompletionProvider;
use crate::session::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionRegistry,
    /// Pluggable provider. Default: `LlmClient`; tests inject scripted fakes.
    pub llm: Arc<dyn CompletionProvider>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, llm: Arc<dyn CompletionProvider>) -> Self {
        Self {
            sessions: SessionRegistry::new(config.session_idle_ttl),
            llm,
            config,
        }
    }
}
