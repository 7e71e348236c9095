use std::sync::Arc;
use std::time::Instant;

use reso_domain::config::Config;

use crate::runtime::Orchestrator;
use crate::store::RecordStore;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Orchestrator,
    pub store: Arc<dyn RecordStore>,

    /// SHA-256 hash of the API bearer token (read once at startup).
    /// `None` = dev mode (no auth enforced).
    pub api_token_hash: Option<Vec<u8>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Arc<Config>, orchestrator: Orchestrator, api_token_hash: Option<Vec<u8>>) -> Self {
        let store = orchestrator.store().clone();
        Self {
            config,
            orchestrator,
            store,
            api_token_hash,
            started_at: Instant::now(),
        }
    }
}
