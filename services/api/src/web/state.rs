//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use course_progress_core::{CoreComponents, DatabaseService, EventPublisher};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub core: CoreComponents,
}

impl AppState {
    /// Wires the core components around the given storage client and event sink.
    pub fn new(
        db: Arc<dyn DatabaseService>,
        events: Arc<dyn EventPublisher>,
        config: Arc<Config>,
    ) -> Self {
        let core = CoreComponents::new(db.clone(), events);
        Self { db, config, core }
    }
}
