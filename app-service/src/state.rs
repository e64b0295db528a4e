//! Application state shared across handlers.

use std::sync::Arc;

use common::config::AppConfig;

use crate::pipeline::StartupResult;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Written once by the startup pipeline before the router is built.
    pub startup: Arc<StartupResult>,
}

impl AppState {
    pub fn new(config: AppConfig, startup: StartupResult) -> Self {
        Self {
            config,
            startup: Arc::new(startup),
        }
    }
}
