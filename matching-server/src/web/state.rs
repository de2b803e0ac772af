//! Application state for the web layer.

use std::sync::Arc;

use crate::matching::MatchingEngine;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Matching engine shared by all handlers
    pub engine: Arc<MatchingEngine>,
}

impl AppState {
    pub fn new(engine: Arc<MatchingEngine>) -> Self {
        Self { engine }
    }
}
