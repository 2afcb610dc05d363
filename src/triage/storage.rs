//! Best-effort triage persistence.
//!
//! Storage here is a secondary concern: the case has already been (or will
//! be) classified, so every write failure is logged and swallowed rather
//! than allowed to abort the triage flow.

use crate::models::{
    CaseClassification, CaseEvent, CaseSnapshot, ClassificationOutcome, DiscoveredEntity,
    TriageRecord,
};
use crate::routing::RoutingContext;
use crate::storage::TriageStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Oracle pricing, USD per million tokens
const PROMPT_COST_PER_MTOK: f64 = 3.0;
const COMPLETION_COST_PER_MTOK: f64 = 15.0;

/// Fallback confidence for entity rows when the oracle declines to score
const DEFAULT_ENTITY_CONFIDENCE: f64 = 0.5;

/// Best-effort wrapper over the triage store
pub struct TriageStorage {
    store: Arc<dyn TriageStore>,
}

impl TriageStorage {
    pub fn new(store: Arc<dyn TriageStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn TriageStore> {
        &self.store
    }

    /// Persist the raw inbound payload plus an intake snapshot.
    ///
    /// Returns the generated record id, or `None` on any failure.
    pub async fn record_inbound(
        &self,
        event: &CaseEvent,
        routing: &RoutingContext,
    ) -> Option<Uuid> {
        let payload = match serde_json::to_value(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(case_number = %event.number, error = %e, "Failed to serialize inbound payload");
                return None;
            }
        };

        let record = TriageRecord {
            id: Uuid::new_v4(),
            case_number: event.number.clone(),
            case_id: event.sys_id.clone(),
            payload,
            snapshot: CaseSnapshot {
                assignment_group: event.assignment_group.clone(),
                category: event.category.clone(),
                priority: event.priority.clone(),
                state: event.state.clone(),
            },
            routing: routing.clone(),
            classification: None,
            created_at: Utc::now(),
        };

        match self.store.record_inbound(&record).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(case_number = %event.number, error = %e, "Failed to persist inbound triage record");
                None
            }
        }
    }

    /// Persist a classification outcome. Failure is logged and swallowed;
    /// classification already succeeded.
    pub async fn save_classification(
        &self,
        case_number: &str,
        workflow_id: &str,
        classification: &CaseClassification,
        processing_time_ms: u64,
        ticket_updated: bool,
    ) {
        let cost_usd = classification
            .token_usage
            .map(|usage| {
                usage.prompt_tokens as f64 * PROMPT_COST_PER_MTOK / 1_000_000.0
                    + usage.completion_tokens as f64 * COMPLETION_COST_PER_MTOK / 1_000_000.0
            })
            .unwrap_or(0.0);

        let outcome = ClassificationOutcome {
            workflow_id: workflow_id.to_string(),
            category: classification.category.clone(),
            subcategory: classification.subcategory.clone(),
            confidence: classification.confidence.unwrap_or(DEFAULT_ENTITY_CONFIDENCE),
            cost_usd,
            business_intelligence_detected: classification.business_intelligence.any(),
            processing_time_ms,
            ticket_updated,
            recorded_at: Utc::now(),
        };

        if let Err(e) = self.store.attach_classification(case_number, outcome).await {
            warn!(case_number = case_number, error = %e, "Failed to persist classification outcome");
        }
    }

    /// Flatten the entity buckets into rows and persist them.
    ///
    /// Returns the number written; 0 when there is nothing to write or the
    /// write fails.
    pub async fn save_entities(
        &self,
        case_number: &str,
        case_id: &str,
        classification: &CaseClassification,
    ) -> usize {
        let entities = &classification.technical_entities;
        if entities.is_empty() {
            return 0;
        }

        let confidence = classification
            .confidence
            .unwrap_or(DEFAULT_ENTITY_CONFIDENCE);

        let rows: Vec<DiscoveredEntity> = entities
            .buckets()
            .into_iter()
            .flat_map(|(entity_type, values)| {
                values.iter().map(move |value| {
                    DiscoveredEntity::new(
                        case_number.to_string(),
                        case_id.to_string(),
                        entity_type,
                        value,
                        confidence,
                    )
                })
            })
            .collect();

        match self.store.save_entities(&rows).await {
            Ok(count) => count,
            Err(e) => {
                warn!(case_number = case_number, error = %e, "Failed to persist discovered entities");
                0
            }
        }
    }
}
