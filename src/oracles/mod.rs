//! Classification and enrichment oracles.
//!
//! Both are opaque external collaborators: the classification oracle maps a
//! case plus its context to a structured judgment, and the enrichment
//! oracle attempts CI matching for an incident. This crate defines the
//! seams and an HTTP-backed client; the judgment logic itself lives
//! elsewhere.

pub mod http;

pub use http::HttpOracleClient;

use crate::classification::ClassificationContext;
use crate::error::Result;
use crate::models::{CaseClassification, CaseEvent};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Maps a normalized case payload plus context to a classification
#[async_trait]
pub trait ClassificationOracle: Send + Sync {
    async fn classify(
        &self,
        event: &CaseEvent,
        context: &ClassificationContext,
    ) -> Result<CaseClassification>;
}

/// Result of one enrichment oracle run for an incident
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentOutcome {
    pub success: bool,

    /// A configuration item was linked to the incident
    #[serde(default)]
    pub ci_linked: bool,

    /// Name of the linked CI, when one was linked
    #[serde(default)]
    pub ci_name: Option<String>,

    /// The oracle needs human input before it can proceed
    #[serde(default)]
    pub clarification_needed: bool,

    /// Oracle-provided detail, set on failure or clarification
    #[serde(default)]
    pub message: Option<String>,
}

/// Attempts entity extraction and CI matching for an incident
#[async_trait]
pub trait EnrichmentOracle: Send + Sync {
    async fn enrich_incident(&self, incident_id: &str) -> Result<EnrichmentOutcome>;
}
