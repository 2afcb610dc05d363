#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use triage_pipeline::classification::{
    CategorySnapshot, CategorySource, CategoryTaxonomy, ClassificationContext,
};
use triage_pipeline::error::{AppError, Result};
use triage_pipeline::models::{CaseClassification, CaseEvent};
use triage_pipeline::oracles::{ClassificationOracle, EnrichmentOracle, EnrichmentOutcome};
use triage_pipeline::ticketing::{
    ApplicationService, CaseRecord, CreatedRecord, NewIncident, NewProblem, RecordTable,
    TicketingClient,
};

/// A 32-char sys_id that passes the caller heuristic
pub const CALLER_SYS_ID: &str = "9f1e2d3c4b5a69788796a5b4c3d2e1f0";

/// Recording ticketing double with scriptable failures
#[derive(Default)]
pub struct MockTicketingClient {
    pub fail_create_incident: bool,
    pub fail_create_problem: bool,
    pub fail_get_case: bool,
    pub fail_update_case: bool,
    pub fail_work_notes: bool,
    pub fail_offering_lookup: bool,
    /// sys_id answered by `lookup_service_offering`
    pub offering: Option<String>,
    /// caller_id answered by `get_case`
    pub resolved_caller: Option<String>,

    pub incidents: Mutex<Vec<NewIncident>>,
    pub problems: Mutex<Vec<NewProblem>>,
    pub case_updates: Mutex<Vec<(String, serde_json::Value)>>,
    pub work_notes: Mutex<Vec<(String, String)>>,
    pub get_case_calls: AtomicUsize,
    pub application_calls: AtomicUsize,
}

impl MockTicketingClient {
    pub fn incident_count(&self) -> usize {
        self.incidents.lock().unwrap().len()
    }

    pub fn last_incident(&self) -> NewIncident {
        self.incidents.lock().unwrap().last().cloned().unwrap()
    }

    pub fn last_case_update(&self) -> (String, serde_json::Value) {
        self.case_updates.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl TicketingClient for MockTicketingClient {
    async fn get_case(&self, sys_id: &str) -> Result<CaseRecord> {
        self.get_case_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get_case {
            return Err(AppError::Ticketing {
                operation: "get_case".to_string(),
                message: "503".to_string(),
            });
        }
        Ok(CaseRecord {
            sys_id: sys_id.to_string(),
            number: "CS0001".to_string(),
            caller_id: self.resolved_caller.clone(),
            ..Default::default()
        })
    }

    async fn create_incident(&self, incident: &NewIncident) -> Result<CreatedRecord> {
        if self.fail_create_incident {
            return Err(AppError::Ticketing {
                operation: "create_incident".to_string(),
                message: "503".to_string(),
            });
        }
        self.incidents.lock().unwrap().push(incident.clone());
        Ok(CreatedRecord {
            sys_id: "a1b2c3d4e5f60718293a4b5c6d7e8f90".to_string(),
            number: "INC0042".to_string(),
        })
    }

    async fn create_problem(&self, problem: &NewProblem) -> Result<CreatedRecord> {
        if self.fail_create_problem {
            return Err(AppError::Ticketing {
                operation: "create_problem".to_string(),
                message: "503".to_string(),
            });
        }
        self.problems.lock().unwrap().push(problem.clone());
        Ok(CreatedRecord {
            sys_id: "prb00000000000000000000000000001".to_string(),
            number: "PRB0007".to_string(),
        })
    }

    async fn update_case(&self, sys_id: &str, fields: serde_json::Value) -> Result<()> {
        if self.fail_update_case {
            return Err(AppError::Ticketing {
                operation: "update_case".to_string(),
                message: "503".to_string(),
            });
        }
        self.case_updates
            .lock()
            .unwrap()
            .push((sys_id.to_string(), fields));
        Ok(())
    }

    async fn add_work_note(&self, table: RecordTable, sys_id: &str, note: &str) -> Result<()> {
        if self.fail_work_notes {
            return Err(AppError::Ticketing {
                operation: "add_work_note".to_string(),
                message: "503".to_string(),
            });
        }
        self.work_notes
            .lock()
            .unwrap()
            .push((format!("{}:{}", table.table_name(), sys_id), note.to_string()));
        Ok(())
    }

    async fn lookup_service_offering(&self, _name: &str) -> Result<Option<String>> {
        if self.fail_offering_lookup {
            return Err(AppError::Ticketing {
                operation: "lookup_service_offering".to_string(),
                message: "503".to_string(),
            });
        }
        Ok(self.offering.clone())
    }

    async fn list_application_services(&self, _company_id: &str) -> Result<Vec<ApplicationService>> {
        self.application_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ApplicationService {
            sys_id: "svc-email".to_string(),
            name: "Email".to_string(),
        }])
    }
}

/// Category source answering a fixed taxonomy
pub struct FixedCategorySource {
    pub fetched_at: DateTime<Utc>,
}

impl Default for FixedCategorySource {
    fn default() -> Self {
        Self {
            fetched_at: Utc::now(),
        }
    }
}

#[async_trait]
impl CategorySource for FixedCategorySource {
    async fn categories(&self) -> Result<CategorySnapshot> {
        Ok(CategorySnapshot {
            taxonomy: CategoryTaxonomy {
                case_categories: vec!["network".to_string(), "software".to_string()],
                incident_categories: vec!["network".to_string()],
                case_subcategories: vec!["vpn".to_string()],
                incident_subcategories: vec!["vpn".to_string()],
                tables_covered: vec!["sn_customerservice_case".to_string()],
            },
            fetched_at: self.fetched_at,
        })
    }
}

/// Oracle answering a fixed classification
pub struct FixedClassificationOracle {
    pub classification: CaseClassification,
    pub calls: AtomicUsize,
}

impl FixedClassificationOracle {
    pub fn new(classification: CaseClassification) -> Self {
        Self {
            classification,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ClassificationOracle for FixedClassificationOracle {
    async fn classify(
        &self,
        _event: &CaseEvent,
        _context: &ClassificationContext,
    ) -> Result<CaseClassification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.classification.clone())
    }
}

/// Enrichment oracle answering a fixed outcome
pub struct FixedEnrichmentOracle {
    pub outcome: EnrichmentOutcome,
    pub calls: AtomicUsize,
}

impl FixedEnrichmentOracle {
    pub fn new(outcome: EnrichmentOutcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn linking(ci_name: &str) -> Self {
        Self::new(EnrichmentOutcome {
            success: true,
            ci_linked: true,
            ci_name: Some(ci_name.to_string()),
            ..Default::default()
        })
    }
}

#[async_trait]
impl EnrichmentOracle for FixedEnrichmentOracle {
    async fn enrich_incident(&self, _incident_id: &str) -> Result<EnrichmentOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.outcome.clone())
    }
}

/// Inbound case fixture
pub fn case_event(number: &str) -> CaseEvent {
    serde_json::from_value(serde_json::json!({
        "sys_id": "cs-sys-0001",
        "number": number,
        "short_description": "VPN tunnel flapping",
        "description": "Site-to-site VPN drops every few minutes.",
        "company": "acme-sys-id",
        "caller_id": CALLER_SYS_ID,
        "business_service": "Email Hosting",
        "assignment_group": "network-ops",
        "category": "inquiry",
        "priority": "2",
        "state": "open",
        "channel_id": "C042",
        "thread_ts": "171234.5678",
    }))
    .unwrap()
}

/// Classification fixture with one extracted entity and no suggestion
pub fn classification() -> CaseClassification {
    serde_json::from_value(serde_json::json!({
        "category": "network",
        "subcategory": "vpn",
        "confidence": 0.92,
        "technical_entities": {
            "ip_addresses": ["10.8.0.1"],
            "systems": ["vpn-gw-01"],
        },
        "business_intelligence": { "scope_detected": true },
        "token_usage": { "prompt_tokens": 2000, "completion_tokens": 400 },
    }))
    .unwrap()
}
