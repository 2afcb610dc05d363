pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::enrichment::EnrichmentScheduler;
use crate::storage::WatchlistStore;
use crate::triage::TriageProcessor;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<TriageProcessor>,
    pub scheduler: Arc<EnrichmentScheduler>,
    pub watchlist: Arc<dyn WatchlistStore>,
}

impl AppState {
    pub fn new(
        processor: Arc<TriageProcessor>,
        scheduler: Arc<EnrichmentScheduler>,
        watchlist: Arc<dyn WatchlistStore>,
    ) -> Self {
        Self {
            processor,
            scheduler,
            watchlist,
        }
    }
}
