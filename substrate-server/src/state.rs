//! Shared `axum` router state: one `System` handle cloned into every
//! request. Mirrors the teacher's `AppState` (`ferrex-server/src/main.rs`),
//! trimmed to what a thin wire adapter needs — no admin-session table, no
//! media-specific service handles.

use std::sync::Arc;

use substrate_config::Config;
use substrate_core::System;

#[derive(Clone)]
pub struct AppState {
    pub system: System,
    pub config: Arc<Config>,
}
