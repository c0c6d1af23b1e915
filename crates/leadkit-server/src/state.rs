use std::sync::Arc;

use leadkit_core::config::Config;
use leadkit_duckdb::LeadStore;

/// Shared application state handed to every handler via Axum's `State`
/// extractor.
pub struct AppState {
    pub db: Arc<LeadStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: LeadStore, config: Config) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
        }
    }
}
