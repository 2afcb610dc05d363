pub mod memory;

pub use memory::{InMemoryTriageStore, InMemoryWatchlistStore};

use crate::error::Result;
use crate::models::{
    ClassificationOutcome, DiscoveredEntity, EnrichmentStage, TriageRecord, WatchlistEntry,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Durable triage history: inbound payloads, classification outcomes and
/// discovered entities. Rows are append-only.
#[async_trait]
pub trait TriageStore: Send + Sync {
    /// Persist an inbound triage record, returning its generated id
    async fn record_inbound(&self, record: &TriageRecord) -> Result<Uuid>;

    /// Attach a classification outcome to the newest unclassified record
    /// for a case
    async fn attach_classification(
        &self,
        case_number: &str,
        outcome: ClassificationOutcome,
    ) -> Result<()>;

    /// Persist discovered entities, returning how many were written
    async fn save_entities(&self, entities: &[DiscoveredEntity]) -> Result<usize>;

    /// Fetch a triage record by id
    async fn get_record(&self, id: &Uuid) -> Result<Option<TriageRecord>>;

    /// All entities discovered for a case
    async fn entities_for_case(&self, case_number: &str) -> Result<Vec<DiscoveredEntity>>;
}

/// Durable enrichment watchlist keyed by incident sys_id.
///
/// Entries are registered by the escalation handler and mutated only by the
/// enrichment scheduler; they are never deleted.
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    /// Register an entry (idempotent: an existing entry for the incident is
    /// left untouched)
    async fn register(&self, entry: WatchlistEntry) -> Result<()>;

    /// Fetch an entry by incident sys_id
    async fn get(&self, incident_id: &str) -> Result<Option<WatchlistEntry>>;

    /// Persist a mutated entry
    async fn update(&self, entry: &WatchlistEntry) -> Result<()>;

    /// Select entries in the given stages whose `last_processed_at` is
    /// older than the cutoff, oldest first, capped at `limit`.
    ///
    /// Selection stamps `last_processed_at` on the returned entries so an
    /// overlapping trigger inside one quiet window cannot double-select.
    async fn select_eligible(
        &self,
        stages: &[EnrichmentStage],
        older_than: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<WatchlistEntry>>;

    /// Counts by stage, for observability only
    async fn stats(&self) -> Result<WatchlistStats>;
}

/// Aggregate watchlist counts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchlistStats {
    pub total: u64,
    pub by_stage: HashMap<String, u64>,
}

impl WatchlistStats {
    pub fn count(&self, stage: EnrichmentStage) -> u64 {
        self.by_stage.get(&stage.to_string()).copied().unwrap_or(0)
    }
}
