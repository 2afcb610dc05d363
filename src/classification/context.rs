//! Classification context assembly.
//!
//! Fans out to the cached category taxonomy and the tenant's live
//! application-service list, joins both, and hands the combined context to
//! the classification oracle. Built once per triage event and read-only
//! afterward.

use crate::error::Result;
use crate::models::CaseEvent;
use crate::routing::RoutingContext;
use crate::ticketing::{ApplicationService, TicketingClient};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Category taxonomy for cases and incidents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryTaxonomy {
    pub case_categories: Vec<String>,
    pub incident_categories: Vec<String>,
    pub case_subcategories: Vec<String>,
    pub incident_subcategories: Vec<String>,
    pub tables_covered: Vec<String>,
}

/// A taxonomy plus the time it was fetched from the platform
#[derive(Debug, Clone)]
pub struct CategorySnapshot {
    pub taxonomy: CategoryTaxonomy,
    pub fetched_at: DateTime<Utc>,
}

/// Source of the (cached) category taxonomy
#[async_trait]
pub trait CategorySource: Send + Sync {
    async fn categories(&self) -> Result<CategorySnapshot>;
}

/// Taxonomy with its staleness verdict
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryContext {
    #[serde(flatten)]
    pub taxonomy: CategoryTaxonomy,

    /// The cache exceeded its freshness budget. A warning, not an error.
    pub is_stale: bool,
}

/// Per-source fetch latency (milliseconds)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FetchTimings {
    pub categories_ms: u64,
    pub applications_ms: u64,
}

/// Context handed to the classification oracle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationContext {
    pub categories: CategoryContext,
    pub application_services: Vec<ApplicationService>,
    pub fetch_timings: FetchTimings,
}

/// Builds a [`ClassificationContext`] for one triage event
pub struct ContextRetriever {
    category_source: Arc<dyn CategorySource>,
    ticketing: Arc<dyn TicketingClient>,
    category_max_age: Duration,
}

impl ContextRetriever {
    pub fn new(
        category_source: Arc<dyn CategorySource>,
        ticketing: Arc<dyn TicketingClient>,
        category_max_age_hours: i64,
    ) -> Self {
        Self {
            category_source,
            ticketing,
            category_max_age: Duration::hours(category_max_age_hours),
        }
    }

    /// Fetch taxonomy and application services concurrently and join both.
    ///
    /// The application-service fetch is skipped entirely (zero latency,
    /// empty list) when the event has no tenant id, and any failure there
    /// degrades to an empty list with a warning. A taxonomy fetch failure
    /// is fatal; classification cannot proceed without it.
    pub async fn enrich(
        &self,
        event: &CaseEvent,
        routing: &RoutingContext,
    ) -> Result<ClassificationContext> {
        let categories_fut = async {
            let started = Instant::now();
            let snapshot = self.category_source.categories().await;
            (snapshot, started.elapsed().as_millis() as u64)
        };

        let applications_fut = async {
            if !event.has_company() {
                return (Vec::new(), 0u64);
            }
            let company = event.company.as_deref().unwrap_or_default();

            let started = Instant::now();
            match self.ticketing.list_application_services(company).await {
                Ok(services) => (services, started.elapsed().as_millis() as u64),
                Err(e) => {
                    warn!(
                        case_number = %event.number,
                        company = company,
                        error = %e,
                        "Application-service fetch failed, classifying with generic fallback"
                    );
                    (Vec::new(), started.elapsed().as_millis() as u64)
                }
            }
        };

        let ((snapshot, categories_ms), (application_services, applications_ms)) =
            tokio::join!(categories_fut, applications_fut);
        let snapshot = snapshot?;

        let age = Utc::now() - snapshot.fetched_at;
        let is_stale = age > self.category_max_age;
        if is_stale {
            warn!(
                case_number = %event.number,
                age_hours = age.num_hours(),
                budget_hours = self.category_max_age.num_hours(),
                "Category taxonomy exceeded freshness budget"
            );
        }

        debug!(
            case_number = %event.number,
            actor = routing.actor_id.as_deref().unwrap_or("-"),
            categories_ms = categories_ms,
            applications_ms = applications_ms,
            application_services = application_services.len(),
            "Classification context assembled"
        );

        Ok(ClassificationContext {
            categories: CategoryContext {
                taxonomy: snapshot.taxonomy,
                is_stale,
            },
            application_services,
            fetch_timings: FetchTimings {
                categories_ms,
                applications_ms,
            },
        })
    }
}
