use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};

/// Hours a clarification request stays open before the scheduler retries
/// enrichment automatically
pub const CLARIFICATION_EXPIRY_HOURS: i64 = 24;

/// Enrichment stage of a watchlist entry
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EnrichmentStage {
    Created,
    NotesAnalyzed,
    CiMatched,
    ClarificationPending,
    Enriched,
    Completed,
    Error,
}

impl EnrichmentStage {
    /// Stages the scheduler selects for processing.
    ///
    /// Includes `ClarificationPending` so the expiry check is reachable; the
    /// per-entry skip logic keeps un-expired clarifications untouched.
    pub fn actively_processing() -> &'static [EnrichmentStage] {
        &[
            EnrichmentStage::Created,
            EnrichmentStage::NotesAnalyzed,
            EnrichmentStage::CiMatched,
            EnrichmentStage::ClarificationPending,
        ]
    }

    /// Terminal stages are never selected again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EnrichmentStage::Completed | EnrichmentStage::Error
        )
    }

    /// Whether a transition to `next` is legal.
    ///
    /// `Completed` is only reachable from `Enriched`; `Error` is reachable
    /// from anywhere; clarification may be re-requested (self-loop refreshes
    /// the request timestamp).
    pub fn can_transition_to(&self, next: EnrichmentStage) -> bool {
        use EnrichmentStage::*;

        if next == Error {
            return !self.is_terminal();
        }

        match self {
            Created => matches!(next, NotesAnalyzed | CiMatched | Enriched | ClarificationPending),
            NotesAnalyzed => matches!(next, CiMatched | Enriched | ClarificationPending),
            CiMatched => matches!(next, Enriched | ClarificationPending),
            ClarificationPending => {
                matches!(next, NotesAnalyzed | CiMatched | Enriched | ClarificationPending)
            }
            Enriched => matches!(next, Completed),
            Completed | Error => false,
        }
    }
}

/// Durable per-incident enrichment state.
///
/// Created by the escalation handler at stage `created`; mutated exclusively
/// by the enrichment scheduler; never deleted (terminal stages remain for
/// audit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEntry {
    /// Incident sys_id (watchlist key)
    pub incident_id: String,

    /// Human-facing incident number
    pub incident_number: String,

    /// Originating case sys_id
    pub case_id: String,

    /// Originating case number
    pub case_number: String,

    /// Current enrichment stage
    pub stage: EnrichmentStage,

    /// Configuration items matched so far
    pub matched_assets: Vec<String>,

    /// Entities extracted during enrichment, by kind
    pub extracted_entities: HashMap<String, Vec<String>>,

    /// Confidence scores, by asset/entity
    pub confidence_scores: HashMap<String, f64>,

    /// Updated on every stage transition; gates the next eligibility check
    pub last_processed_at: DateTime<Utc>,

    /// Set when the entry enters `clarification_pending`
    pub clarification_requested_at: Option<DateTime<Utc>>,

    /// Free-form metadata (originating channel/thread, tenant id)
    pub metadata: HashMap<String, String>,

    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

impl WatchlistEntry {
    /// Register a new entry at stage `created`
    pub fn new(
        incident_id: String,
        incident_number: String,
        case_id: String,
        case_number: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            incident_id,
            incident_number,
            case_id,
            case_number,
            stage: EnrichmentStage::Created,
            matched_assets: Vec::new(),
            extracted_entities: HashMap::new(),
            confidence_scores: HashMap::new(),
            last_processed_at: now,
            clarification_requested_at: None,
            metadata: HashMap::new(),
            created_at: now,
        }
    }

    pub fn with_metadata(mut self, key: &str, value: String) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Move the entry to a new stage, refreshing `last_processed_at`.
    ///
    /// Entering `clarification_pending` stamps `clarification_requested_at`;
    /// leaving it clears the stamp.
    pub fn transition(&mut self, next: EnrichmentStage) -> crate::error::Result<()> {
        if !self.stage.can_transition_to(next) {
            return Err(crate::error::AppError::InvalidStageTransition(format!(
                "{} cannot move from {} to {}",
                self.incident_number, self.stage, next
            )));
        }

        let now = Utc::now();
        self.stage = next;
        self.last_processed_at = now;
        self.clarification_requested_at = if next == EnrichmentStage::ClarificationPending {
            Some(now)
        } else {
            None
        };

        Ok(())
    }

    /// Refresh `last_processed_at` without changing stage (used after a
    /// no-transition oracle run)
    pub fn touch(&mut self) {
        self.last_processed_at = Utc::now();
    }

    /// Hours since clarification was requested, if pending
    pub fn clarification_age_hours(&self, now: DateTime<Utc>) -> Option<i64> {
        self.clarification_requested_at
            .map(|requested| (now - requested).num_hours())
    }

    /// Whether a pending clarification has passed its expiry window
    pub fn clarification_expired(&self, now: DateTime<Utc>) -> bool {
        self.clarification_age_hours(now)
            .is_some_and(|hours| hours >= CLARIFICATION_EXPIRY_HOURS)
    }
}
