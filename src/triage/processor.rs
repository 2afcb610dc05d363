//! End-to-end triage of one inbound case event.
//!
//! Orchestrates the flow: persist the raw event, assemble classification
//! context, ask the oracle, write the category back onto the case, record
//! the outcome and extracted entities, then act on any record-type
//! escalation suggestion. Context assembly and the oracle call are the only
//! fatal steps; everything downstream of a successful classification is
//! best-effort.

use crate::classification::ContextRetriever;
use crate::error::Result;
use crate::escalation::{EscalationOutcome, RecordEscalationHandler};
use crate::models::{CaseClassification, CaseEvent};
use crate::oracles::ClassificationOracle;
use crate::routing::RoutingContext;
use crate::ticketing::TicketingClient;
use crate::triage::TriageStorage;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// What one triage run produced
#[derive(Debug, Clone, Serialize)]
pub struct TriageOutcome {
    /// Workflow id stamped on logs and stored rows for this run
    pub workflow_id: String,

    /// Id of the persisted inbound record, when persistence succeeded
    pub triage_id: Option<Uuid>,

    pub classification: CaseClassification,

    /// The classified category was written back onto the case
    pub ticket_updated: bool,

    pub entities_saved: usize,

    /// Present when the oracle suggested a record-type escalation
    pub escalation: Option<EscalationOutcome>,
}

/// Drives the triage flow for inbound case events
pub struct TriageProcessor {
    storage: TriageStorage,
    retriever: ContextRetriever,
    oracle: Arc<dyn ClassificationOracle>,
    ticketing: Arc<dyn TicketingClient>,
    escalation: RecordEscalationHandler,
}

impl TriageProcessor {
    pub fn new(
        storage: TriageStorage,
        retriever: ContextRetriever,
        oracle: Arc<dyn ClassificationOracle>,
        ticketing: Arc<dyn TicketingClient>,
        escalation: RecordEscalationHandler,
    ) -> Self {
        Self {
            storage,
            retriever,
            oracle,
            ticketing,
            escalation,
        }
    }

    /// Triage one case event.
    ///
    /// Fails only when the classification context cannot be assembled or
    /// the oracle call fails; storage writes, the category writeback, and
    /// escalation steps degrade with warnings.
    pub async fn process_case(&self, event: &CaseEvent) -> Result<TriageOutcome> {
        let workflow_id = Uuid::new_v4().to_string();
        let routing = RoutingContext::from_event(event);

        info!(
            case_number = %event.number,
            workflow_id = %workflow_id,
            actor = routing.actor_id.as_deref().unwrap_or("-"),
            "Triage started"
        );

        let triage_id = self.storage.record_inbound(event, &routing).await;

        let context = self.retriever.enrich(event, &routing).await?;

        let started = Instant::now();
        let classification = self.oracle.classify(event, &context).await?;
        let processing_time_ms = started.elapsed().as_millis() as u64;

        info!(
            case_number = %event.number,
            workflow_id = %workflow_id,
            category = %classification.category,
            confidence = classification.confidence.unwrap_or(0.0),
            entities = classification.technical_entities.total(),
            processing_time_ms = processing_time_ms,
            "Case classified"
        );

        let ticket_updated = self.write_back_category(event, &classification).await;

        self.storage
            .save_classification(
                &event.number,
                &workflow_id,
                &classification,
                processing_time_ms,
                ticket_updated,
            )
            .await;

        let entities_saved = self
            .storage
            .save_entities(&event.number, &event.sys_id, &classification)
            .await;

        let escalation = match &classification.record_type_suggestion {
            Some(suggestion) => {
                info!(
                    case_number = %event.number,
                    workflow_id = %workflow_id,
                    reasoning = suggestion.reasoning(),
                    "Record-type escalation suggested"
                );
                Some(
                    self.escalation
                        .handle(suggestion, &classification, event, &routing)
                        .await,
                )
            }
            None => None,
        };

        Ok(TriageOutcome {
            workflow_id,
            triage_id,
            classification,
            ticket_updated,
            entities_saved,
            escalation,
        })
    }

    /// Write the classified category (and subcategory, when present) back
    /// onto the case. Best-effort; the classification stands either way.
    async fn write_back_category(
        &self,
        event: &CaseEvent,
        classification: &CaseClassification,
    ) -> bool {
        if classification.category.is_empty() {
            return false;
        }

        let mut fields = serde_json::json!({ "category": classification.category });
        if let Some(subcategory) = classification
            .subcategory
            .as_deref()
            .filter(|s| !s.is_empty())
        {
            fields["subcategory"] = serde_json::Value::String(subcategory.to_string());
        }

        match self.ticketing.update_case(&event.sys_id, fields).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    case_number = %event.number,
                    error = %e,
                    "Category writeback failed, case keeps its intake category"
                );
                false
            }
        }
    }
}
