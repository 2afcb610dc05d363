//! Ticketing platform collaborator.
//!
//! The pipeline consumes a narrow slice of the platform's table API:
//! create-incident, create-problem, update-case, add-work-note,
//! lookup-service-offering and list-application-services. Everything else
//! the platform offers stays behind this seam.

pub mod http;

pub use http::HttpTicketingClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Case fields the pipeline reads back from the platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseRecord {
    pub sys_id: String,
    pub number: String,
    #[serde(default)]
    pub caller_id: Option<String>,
    #[serde(default)]
    pub business_service: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Fields for a new incident record
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewIncident {
    pub short_description: String,
    pub description: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_group: Option<String>,
    /// Major-incident candidate flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_incident_state: Option<String>,
}

/// Fields for a new problem record
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewProblem {
    pub short_description: String,
    pub description: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// sys_id and number of a freshly created record
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedRecord {
    pub sys_id: String,
    pub number: String,
}

/// An application service registered to a tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationService {
    pub sys_id: String,
    pub name: String,
}

/// Record tables work notes can be appended to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordTable {
    Case,
    Incident,
    Problem,
}

impl RecordTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            RecordTable::Case => "sn_customerservice_case",
            RecordTable::Incident => "incident",
            RecordTable::Problem => "problem",
        }
    }
}

/// Client for the ticketing platform's table API
#[async_trait]
pub trait TicketingClient: Send + Sync {
    /// Fetch a case by sys_id
    async fn get_case(&self, sys_id: &str) -> Result<CaseRecord>;

    /// Create an incident record
    async fn create_incident(&self, incident: &NewIncident) -> Result<CreatedRecord>;

    /// Create a problem record
    async fn create_problem(&self, problem: &NewProblem) -> Result<CreatedRecord>;

    /// Patch fields on a case (idempotent field update)
    async fn update_case(&self, sys_id: &str, fields: serde_json::Value) -> Result<()>;

    /// Append a work note to a record
    async fn add_work_note(&self, table: RecordTable, sys_id: &str, note: &str) -> Result<()>;

    /// Resolve a service offering by name, returning its sys_id when found
    async fn lookup_service_offering(&self, name: &str) -> Result<Option<String>>;

    /// List application services registered to a company
    async fn list_application_services(&self, company_id: &str) -> Result<Vec<ApplicationService>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_table_names() {
        assert_eq!(RecordTable::Case.table_name(), "sn_customerservice_case");
        assert_eq!(RecordTable::Incident.table_name(), "incident");
        assert_eq!(RecordTable::Problem.table_name(), "problem");
    }

    #[test]
    fn test_new_incident_skips_absent_fields() {
        let incident = NewIncident {
            short_description: "outage".to_string(),
            description: "details".to_string(),
            category: "network".to_string(),
            ..Default::default()
        };

        let json = serde_json::to_value(&incident).unwrap();
        assert!(json.get("caller_id").is_none());
        assert!(json.get("business_service").is_none());
        assert_eq!(json["category"], "network");
    }
}
