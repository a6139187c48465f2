//! HTTP API for the conductor terminal and the admin dashboard

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::alerts::AlertFeed;
use crate::catalog::Catalog;
use crate::insights::Summarizer;
use crate::runtime::ConductorRuntime;
use chrono::FixedOffset;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ConductorRuntime>,
    pub catalog: Arc<Catalog>,
    pub summarizer: Arc<dyn Summarizer>,
    pub alerts: Arc<dyn AlertFeed>,
    /// Fleet's local offset for the hourly chart
    pub utc_offset: FixedOffset,
}
