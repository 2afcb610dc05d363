use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Structured judgment produced by the classification oracle for one case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseClassification {
    /// Resolved case category
    pub category: String,

    /// Resolved case subcategory
    #[serde(default)]
    pub subcategory: Option<String>,

    /// Incident-specific category, present when the oracle suggests
    /// escalation to an incident
    #[serde(default)]
    pub incident_category: Option<String>,

    /// Overall confidence (0.0 - 1.0), absent when the oracle declines to
    /// score
    #[serde(default)]
    pub confidence: Option<f64>,

    /// Technical entities extracted from the case text
    #[serde(default)]
    pub technical_entities: TechnicalEntities,

    /// Business-intelligence flags
    #[serde(default)]
    pub business_intelligence: BusinessIntelligence,

    /// Token usage of the oracle call
    #[serde(default)]
    pub token_usage: Option<TokenUsage>,

    /// Optional record-type escalation suggestion
    #[serde(default)]
    pub record_type_suggestion: Option<RecordTypeSuggestion>,
}

/// Extracted technical entities, grouped by kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicalEntities {
    #[serde(default)]
    pub ip_addresses: Vec<String>,

    #[serde(default)]
    pub systems: Vec<String>,

    #[serde(default)]
    pub users: Vec<String>,

    #[serde(default)]
    pub software: Vec<String>,

    #[serde(default)]
    pub error_codes: Vec<String>,

    #[serde(default)]
    pub network_devices: Vec<String>,
}

impl TechnicalEntities {
    /// Iterate the six entity buckets with their kind
    pub fn buckets(&self) -> [(EntityType, &Vec<String>); 6] {
        [
            (EntityType::IpAddress, &self.ip_addresses),
            (EntityType::System, &self.systems),
            (EntityType::User, &self.users),
            (EntityType::Software, &self.software),
            (EntityType::ErrorCode, &self.error_codes),
            (EntityType::NetworkDevice, &self.network_devices),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.buckets().iter().all(|(_, values)| values.is_empty())
    }

    pub fn total(&self) -> usize {
        self.buckets().iter().map(|(_, values)| values.len()).sum()
    }
}

/// Kind of an extracted technical entity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityType {
    IpAddress,
    System,
    User,
    Software,
    ErrorCode,
    NetworkDevice,
}

/// Business-intelligence sub-signals reported by the oracle
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BusinessIntelligence {
    #[serde(default)]
    pub scope_detected: bool,

    #[serde(default)]
    pub executive_visibility: bool,

    #[serde(default)]
    pub compliance_impact: bool,

    #[serde(default)]
    pub financial_impact: bool,
}

impl BusinessIntelligence {
    /// Logical OR of the four sub-signals
    pub fn any(&self) -> bool {
        self.scope_detected
            || self.executive_visibility
            || self.compliance_impact
            || self.financial_impact
    }
}

/// Token usage of an oracle call
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,

    #[serde(default)]
    pub completion_tokens: u64,
}

/// Record-type escalation suggestion, tagged by target record type.
///
/// Each variant carries only the fields relevant to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordTypeSuggestion {
    Incident {
        #[serde(default)]
        is_major_incident: bool,
        reasoning: String,
    },
    Problem {
        reasoning: String,
    },
    Change {
        reasoning: String,
    },
}

impl RecordTypeSuggestion {
    pub fn reasoning(&self) -> &str {
        match self {
            RecordTypeSuggestion::Incident { reasoning, .. } => reasoning,
            RecordTypeSuggestion::Problem { reasoning } => reasoning,
            RecordTypeSuggestion::Change { reasoning } => reasoning,
        }
    }
}
