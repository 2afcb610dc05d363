use crate::error::{AppError, Result};
use crate::models::{
    ClassificationOutcome, DiscoveredEntity, EnrichmentStage, TriageRecord, WatchlistEntry,
};
use crate::storage::{TriageStore, WatchlistStore, WatchlistStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory triage store (for MVP and testing)
#[derive(Clone, Default)]
pub struct InMemoryTriageStore {
    records: Arc<DashMap<Uuid, TriageRecord>>,
    entities: Arc<DashMap<String, Vec<DiscoveredEntity>>>,
}

impl InMemoryTriageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TriageStore for InMemoryTriageStore {
    async fn record_inbound(&self, record: &TriageRecord) -> Result<Uuid> {
        self.records.insert(record.id, record.clone());
        tracing::debug!(triage_id = %record.id, case_number = %record.case_number, "Triage record saved");
        Ok(record.id)
    }

    async fn attach_classification(
        &self,
        case_number: &str,
        outcome: ClassificationOutcome,
    ) -> Result<()> {
        // Newest unclassified record for the case; historical rows stay as
        // written.
        let target = self
            .records
            .iter()
            .filter(|entry| {
                entry.value().case_number == case_number && entry.value().classification.is_none()
            })
            .max_by_key(|entry| entry.value().created_at)
            .map(|entry| *entry.key());

        let Some(id) = target else {
            return Err(AppError::NotFound(format!(
                "no unclassified triage record for case {}",
                case_number
            )));
        };

        if let Some(mut record) = self.records.get_mut(&id) {
            record.classification = Some(outcome);
        }
        Ok(())
    }

    async fn save_entities(&self, entities: &[DiscoveredEntity]) -> Result<usize> {
        for entity in entities {
            self.entities
                .entry(entity.case_number.clone())
                .or_default()
                .push(entity.clone());
        }
        Ok(entities.len())
    }

    async fn get_record(&self, id: &Uuid) -> Result<Option<TriageRecord>> {
        Ok(self.records.get(id).map(|entry| entry.clone()))
    }

    async fn entities_for_case(&self, case_number: &str) -> Result<Vec<DiscoveredEntity>> {
        Ok(self
            .entities
            .get(case_number)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }
}

/// In-memory watchlist store (for MVP and testing)
#[derive(Clone, Default)]
pub struct InMemoryWatchlistStore {
    entries: Arc<DashMap<String, WatchlistEntry>>,
}

impl InMemoryWatchlistStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WatchlistStore for InMemoryWatchlistStore {
    async fn register(&self, entry: WatchlistEntry) -> Result<()> {
        if self.entries.contains_key(&entry.incident_id) {
            tracing::debug!(
                incident_id = %entry.incident_id,
                "Watchlist entry already registered, leaving untouched"
            );
            return Ok(());
        }

        tracing::debug!(
            incident_id = %entry.incident_id,
            incident_number = %entry.incident_number,
            "Watchlist entry registered"
        );
        self.entries.insert(entry.incident_id.clone(), entry);
        Ok(())
    }

    async fn get(&self, incident_id: &str) -> Result<Option<WatchlistEntry>> {
        Ok(self.entries.get(incident_id).map(|entry| entry.clone()))
    }

    async fn update(&self, entry: &WatchlistEntry) -> Result<()> {
        if !self.entries.contains_key(&entry.incident_id) {
            return Err(AppError::NotFound(format!(
                "watchlist entry {} not found",
                entry.incident_id
            )));
        }
        self.entries.insert(entry.incident_id.clone(), entry.clone());
        Ok(())
    }

    async fn select_eligible(
        &self,
        stages: &[EnrichmentStage],
        older_than: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<WatchlistEntry>> {
        let mut eligible: Vec<WatchlistEntry> = self
            .entries
            .iter()
            .filter(|entry| {
                stages.contains(&entry.value().stage)
                    && entry.value().last_processed_at < older_than
            })
            .map(|entry| entry.value().clone())
            .collect();

        eligible.sort_by_key(|entry| entry.last_processed_at);
        eligible.truncate(limit);

        // Stamp selection time so an overlapping trigger cannot pick the
        // same entries again within the quiet window.
        let now = Utc::now();
        for selected in &eligible {
            if let Some(mut entry) = self.entries.get_mut(&selected.incident_id) {
                entry.last_processed_at = now;
            }
        }

        Ok(eligible)
    }

    async fn stats(&self) -> Result<WatchlistStats> {
        let mut by_stage: HashMap<String, u64> = HashMap::new();
        for entry in self.entries.iter() {
            *by_stage.entry(entry.value().stage.to_string()).or_default() += 1;
        }

        Ok(WatchlistStats {
            total: self.entries.len() as u64,
            by_stage,
        })
    }
}
