//! Record escalation.
//!
//! Turns a classification's record-type suggestion into a created Incident
//! or Problem, links it back to the originating case, and registers new
//! incidents into the enrichment watchlist. Every external call is
//! best-effort: a failure at any step is logged and the handler still
//! returns whatever succeeded. No retries happen at this layer.

use crate::models::{CaseClassification, CaseEvent, RecordTypeSuggestion, WatchlistEntry};
use crate::routing::RoutingContext;
use crate::storage::WatchlistStore;
use crate::ticketing::{NewIncident, NewProblem, RecordTable, TicketingClient};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Platform sys_id length; shorter or longer caller values are display
/// names that need re-resolution
const SYS_ID_LEN: usize = 32;

fn looks_like_sys_id(value: &str) -> bool {
    value.len() == SYS_ID_LEN && value.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Best-effort result of one escalation attempt
#[derive(Debug, Clone, Default, Serialize)]
pub struct EscalationOutcome {
    pub incident_created: bool,
    pub incident_number: Option<String>,
    pub incident_id: Option<String>,
    pub problem_created: bool,
    pub problem_number: Option<String>,
    pub case_linked: bool,
    pub audit_note_added: bool,
    pub watchlist_registered: bool,
}

/// Handles record-type suggestions from the classification oracle
pub struct RecordEscalationHandler {
    ticketing: Arc<dyn TicketingClient>,
    watchlist: Arc<dyn WatchlistStore>,
    enrichment_enabled: bool,
}

impl RecordEscalationHandler {
    pub fn new(
        ticketing: Arc<dyn TicketingClient>,
        watchlist: Arc<dyn WatchlistStore>,
        enrichment_enabled: bool,
    ) -> Self {
        Self {
            ticketing,
            watchlist,
            enrichment_enabled,
        }
    }

    /// Act on a record-type suggestion. Never fails; the outcome reflects
    /// whatever steps succeeded.
    pub async fn handle(
        &self,
        suggestion: &RecordTypeSuggestion,
        classification: &CaseClassification,
        event: &CaseEvent,
        routing: &RoutingContext,
    ) -> EscalationOutcome {
        match suggestion {
            RecordTypeSuggestion::Incident {
                is_major_incident,
                reasoning,
            } => {
                self.escalate_to_incident(classification, event, routing, *is_major_incident, reasoning)
                    .await
            }
            RecordTypeSuggestion::Problem { reasoning } => {
                self.escalate_to_problem(classification, event, reasoning).await
            }
            RecordTypeSuggestion::Change { reasoning } => {
                info!(
                    case_number = %event.number,
                    reasoning = reasoning,
                    "Change suggested; leaving for manual change-management handoff"
                );
                EscalationOutcome::default()
            }
        }
    }

    /// Incident category falls back to the generic case category
    fn resolve_category(&self, classification: &CaseClassification) -> String {
        classification
            .incident_category
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(&classification.category)
            .to_string()
    }

    /// Best-effort service-offering resolution: keep the case's original
    /// reference whenever the lookup fails or finds nothing.
    async fn resolve_business_service(&self, event: &CaseEvent) -> Option<String> {
        let name = event.business_service.as_deref().filter(|n| !n.is_empty())?;

        match self.ticketing.lookup_service_offering(name).await {
            Ok(Some(sys_id)) => Some(sys_id),
            Ok(None) => {
                warn!(
                    case_number = %event.number,
                    business_service = name,
                    "Service offering not found, keeping case reference"
                );
                Some(name.to_string())
            }
            Err(e) => {
                warn!(
                    case_number = %event.number,
                    business_service = name,
                    error = %e,
                    "Service offering lookup failed, keeping case reference"
                );
                Some(name.to_string())
            }
        }
    }

    /// Re-resolve caller values that look like display names rather than
    /// sys_ids. A failed re-resolution is a validation warning, never a
    /// blocker.
    async fn resolve_caller(&self, event: &CaseEvent) -> Option<String> {
        let caller = event.caller_id.as_deref().filter(|c| !c.is_empty())?;

        if looks_like_sys_id(caller) {
            return Some(caller.to_string());
        }

        match self.ticketing.get_case(&event.sys_id).await {
            Ok(case) => match case.caller_id.as_deref().filter(|c| looks_like_sys_id(c)) {
                Some(resolved) => Some(resolved.to_string()),
                None => {
                    warn!(
                        case_number = %event.number,
                        caller = caller,
                        "Caller re-resolution returned no sys_id, proceeding with original value"
                    );
                    Some(caller.to_string())
                }
            },
            Err(e) => {
                warn!(
                    case_number = %event.number,
                    caller = caller,
                    error = %e,
                    "Caller re-resolution failed, proceeding with original value"
                );
                Some(caller.to_string())
            }
        }
    }

    fn audit_note(&self, reasoning: &str, category: &str, major: bool) -> String {
        let mut note = format!(
            "Automated escalation.\nReasoning: {}\nCategory: {}",
            reasoning, category
        );
        if major {
            note.push_str("\nMajor incident candidate.");
        }
        note
    }

    async fn escalate_to_incident(
        &self,
        classification: &CaseClassification,
        event: &CaseEvent,
        routing: &RoutingContext,
        major: bool,
        reasoning: &str,
    ) -> EscalationOutcome {
        let mut outcome = EscalationOutcome::default();

        let category = self.resolve_category(classification);
        if category.is_empty() {
            warn!(
                case_number = %event.number,
                "No category resolved for incident escalation, proceeding without one"
            );
        }

        let business_service = self.resolve_business_service(event).await;
        let caller_id = self.resolve_caller(event).await;

        let incident = NewIncident {
            short_description: event.short_description.clone(),
            description: format!(
                "Escalated from case {}.\n\n{}",
                event.number, event.description
            ),
            category: category.clone(),
            caller_id,
            business_service,
            company: event.company.clone(),
            assignment_group: event.assignment_group.clone(),
            major_incident_state: major.then(|| "proposed".to_string()),
        };

        let created = match self.ticketing.create_incident(&incident).await {
            Ok(created) => created,
            Err(e) => {
                error!(
                    case_number = %event.number,
                    error = %e,
                    "Incident creation failed"
                );
                return outcome;
            }
        };

        info!(
            case_number = %event.number,
            incident_number = %created.number,
            major = major,
            "Incident created from case"
        );
        outcome.incident_created = true;
        outcome.incident_number = Some(created.number.clone());
        outcome.incident_id = Some(created.sys_id.clone());

        // Idempotent back-link onto the originating case
        let link = serde_json::json!({ "incident": created.sys_id });
        match self.ticketing.update_case(&event.sys_id, link).await {
            Ok(()) => outcome.case_linked = true,
            Err(e) => warn!(
                case_number = %event.number,
                incident_number = %created.number,
                error = %e,
                "Failed to link incident back onto case"
            ),
        }

        let note = self.audit_note(reasoning, &category, major);
        match self
            .ticketing
            .add_work_note(RecordTable::Case, &event.sys_id, &note)
            .await
        {
            Ok(()) => outcome.audit_note_added = true,
            Err(e) => warn!(
                case_number = %event.number,
                error = %e,
                "Failed to append escalation audit note"
            ),
        }

        if self.enrichment_enabled {
            let mut entry = WatchlistEntry::new(
                created.sys_id.clone(),
                created.number.clone(),
                event.sys_id.clone(),
                event.number.clone(),
            );
            if let Some(channel) = routing.channel_id.as_deref() {
                entry = entry.with_metadata("channel_id", channel.to_string());
            }
            if let Some(thread) = event.thread_ts.as_deref() {
                entry = entry.with_metadata("thread_ts", thread.to_string());
            }
            if let Some(company) = event.company.as_deref() {
                entry = entry.with_metadata("company", company.to_string());
            }

            // Registration failure must not unwind the created incident
            match self.watchlist.register(entry).await {
                Ok(()) => outcome.watchlist_registered = true,
                Err(e) => warn!(
                    incident_number = %created.number,
                    error = %e,
                    "Watchlist registration failed, incident stands"
                ),
            }
        }

        outcome
    }

    async fn escalate_to_problem(
        &self,
        classification: &CaseClassification,
        event: &CaseEvent,
        reasoning: &str,
    ) -> EscalationOutcome {
        let mut outcome = EscalationOutcome::default();

        let category = self.resolve_category(classification);
        let business_service = self.resolve_business_service(event).await;

        let problem = NewProblem {
            short_description: event.short_description.clone(),
            description: format!(
                "Escalated from case {}.\n\n{}",
                event.number, event.description
            ),
            category: category.clone(),
            business_service,
            company: event.company.clone(),
        };

        let created = match self.ticketing.create_problem(&problem).await {
            Ok(created) => created,
            Err(e) => {
                error!(
                    case_number = %event.number,
                    error = %e,
                    "Problem creation failed"
                );
                return outcome;
            }
        };

        info!(
            case_number = %event.number,
            problem_number = %created.number,
            "Problem created from case"
        );
        outcome.problem_created = true;
        outcome.problem_number = Some(created.number.clone());

        let note = self.audit_note(reasoning, &category, false);
        match self
            .ticketing
            .add_work_note(RecordTable::Case, &event.sys_id, &note)
            .await
        {
            Ok(()) => outcome.audit_note_added = true,
            Err(e) => warn!(
                case_number = %event.number,
                error = %e,
                "Failed to append escalation audit note"
            ),
        }

        outcome
    }
}
