//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use mood_insight_core::{ports::SubjectDirectory, EmotionAnalyzer};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: EmotionAnalyzer,
    pub directory: Arc<dyn SubjectDirectory>,
    pub config: Arc<Config>,
}
