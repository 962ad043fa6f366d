use std::sync::Arc;

use chrono::Local;
use coach_core::{DateRange, Orchestrator};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        AppState {
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Week every endpoint operates on, computed per request.
    pub fn next_week(&self) -> DateRange {
        DateRange::next_week(Local::now().date_naive())
    }
}
