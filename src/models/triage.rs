use crate::models::EntityType;
use crate::routing::RoutingContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum stored length of a discovered entity value
pub const MAX_ENTITY_VALUE_LEN: usize = 500;

/// Durable record of one inbound triage event.
///
/// Append-only: the classification outcome is attached once after the oracle
/// call; historical rows are never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageRecord {
    /// Unique identifier
    pub id: Uuid,

    /// Case number
    pub case_number: String,

    /// Case sys_id
    pub case_id: String,

    /// Raw inbound payload
    pub payload: serde_json::Value,

    /// Case state at time of intake
    pub snapshot: CaseSnapshot,

    /// Routing context the event was processed under
    pub routing: RoutingContext,

    /// Classification outcome, attached after the oracle call
    pub classification: Option<ClassificationOutcome>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Case field values captured at intake
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseSnapshot {
    pub assignment_group: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub state: Option<String>,
}

/// Persisted result of a classification run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    /// Workflow invocation id the classification ran under
    pub workflow_id: String,

    /// Resolved category
    pub category: String,

    /// Resolved subcategory
    pub subcategory: Option<String>,

    /// Overall confidence
    pub confidence: f64,

    /// Monetary cost of the oracle call (USD)
    pub cost_usd: f64,

    /// OR of the four business-intelligence sub-signals
    pub business_intelligence_detected: bool,

    /// End-to-end processing time (milliseconds)
    pub processing_time_ms: u64,

    /// Whether the originating ticket was updated with the result
    pub ticket_updated: bool,

    /// When the outcome was recorded
    pub recorded_at: DateTime<Utc>,
}

/// One technical entity extracted from a case, stored additively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredEntity {
    pub id: Uuid,
    pub case_number: String,
    pub case_id: String,
    pub entity_type: EntityType,
    pub value: String,
    pub confidence: f64,
    pub status: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl DiscoveredEntity {
    /// Build an entity row, truncating the value to the storage limit.
    pub fn new(
        case_number: String,
        case_id: String,
        entity_type: EntityType,
        value: &str,
        confidence: f64,
    ) -> Self {
        let value = if value.len() > MAX_ENTITY_VALUE_LEN {
            let mut end = MAX_ENTITY_VALUE_LEN;
            while !value.is_char_boundary(end) {
                end -= 1;
            }
            value[..end].to_string()
        } else {
            value.to_string()
        };

        Self {
            id: Uuid::new_v4(),
            case_number,
            case_id,
            entity_type,
            value,
            confidence,
            status: "discovered".to_string(),
            source: "oracle".to_string(),
            created_at: Utc::now(),
        }
    }
}
