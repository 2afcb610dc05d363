//! Cached category taxonomy backed by the platform choice lists.
//!
//! The taxonomy changes rarely, so it is fetched once and served from an
//! in-process cache until the refresh interval elapses. A failed refresh
//! falls back to the cached snapshot with its original `fetched_at`, which
//! lets the retriever's staleness check surface long outages as warnings.

use crate::classification::{CategorySnapshot, CategorySource, CategoryTaxonomy};
use crate::config::TicketingConfig;
use crate::error::{AppError, Result};
use crate::ticketing::RecordTable;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use std::time::Duration as StdDuration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// How long a cached snapshot is served before a refresh is attempted
const REFRESH_AFTER_HOURS: i64 = 1;

/// The choice-list elements that make up the taxonomy
const TAXONOMY_ELEMENTS: [(RecordTable, &str); 4] = [
    (RecordTable::Case, "category"),
    (RecordTable::Case, "subcategory"),
    (RecordTable::Incident, "category"),
    (RecordTable::Incident, "subcategory"),
];

/// [`CategorySource`] that reads the platform's `sys_choice` table and
/// caches the result in-process
pub struct CachedCategorySource {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    cache: RwLock<Option<CategorySnapshot>>,
    refresh_after: Duration,
}

impl CachedCategorySource {
    pub fn from_config(config: &TicketingConfig) -> Result<Self> {
        let username = config
            .username_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .unwrap_or_default();
        let password = config
            .password_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .unwrap_or_default();

        let client = Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username,
            password,
            cache: RwLock::new(None),
            refresh_after: Duration::hours(REFRESH_AFTER_HOURS),
        })
    }

    async fn fetch_choice_values(&self, table: RecordTable, element: &str) -> Result<Vec<String>> {
        let operation = "fetch_categories";
        let url = format!("{}/api/now/table/sys_choice", self.base_url);
        let query = format!(
            "name={}^element={}^inactive=false",
            table.table_name(),
            element
        );

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .query(&[
                ("sysparm_query", query.as_str()),
                ("sysparm_fields", "value"),
                ("sysparm_limit", "1000"),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(format!("ticketing {operation}"))
                } else {
                    AppError::Ticketing {
                        operation: operation.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Ticketing {
                operation: operation.to_string(),
                message: format!("status {}", status.as_u16()),
            });
        }

        let payload: serde_json::Value =
            response.json().await.map_err(|e| AppError::Ticketing {
                operation: operation.to_string(),
                message: format!("invalid response body: {}", e),
            })?;

        let records = payload
            .get("result")
            .and_then(|r| r.as_array())
            .ok_or_else(|| AppError::Ticketing {
                operation: operation.to_string(),
                message: "response missing 'result'".to_string(),
            })?;

        let mut values: Vec<String> = records
            .iter()
            .filter_map(|record| record.get("value").and_then(|v| v.as_str()))
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect();
        values.sort();
        values.dedup();
        Ok(values)
    }

    async fn fetch_taxonomy(&self) -> Result<CategoryTaxonomy> {
        let mut taxonomy = CategoryTaxonomy::default();

        for (table, element) in TAXONOMY_ELEMENTS {
            let values = self.fetch_choice_values(table, element).await?;
            match (table, element) {
                (RecordTable::Case, "category") => taxonomy.case_categories = values,
                (RecordTable::Case, _) => taxonomy.case_subcategories = values,
                (RecordTable::Incident, "category") => taxonomy.incident_categories = values,
                (RecordTable::Incident, _) => taxonomy.incident_subcategories = values,
                _ => {}
            }
        }

        taxonomy.tables_covered = vec![
            RecordTable::Case.table_name().to_string(),
            RecordTable::Incident.table_name().to_string(),
        ];

        Ok(taxonomy)
    }
}

#[async_trait]
impl CategorySource for CachedCategorySource {
    async fn categories(&self) -> Result<CategorySnapshot> {
        let now = Utc::now();

        {
            let cache = self.cache.read().await;
            if let Some(snapshot) = cache.as_ref() {
                if now - snapshot.fetched_at < self.refresh_after {
                    debug!(
                        age_minutes = (now - snapshot.fetched_at).num_minutes(),
                        "Serving cached category taxonomy"
                    );
                    return Ok(snapshot.clone());
                }
            }
        }

        match self.fetch_taxonomy().await {
            Ok(taxonomy) => {
                info!(
                    case_categories = taxonomy.case_categories.len(),
                    incident_categories = taxonomy.incident_categories.len(),
                    "Category taxonomy refreshed"
                );
                let snapshot = CategorySnapshot {
                    taxonomy,
                    fetched_at: now,
                };
                *self.cache.write().await = Some(snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => {
                let cache = self.cache.read().await;
                match cache.as_ref() {
                    // The stale fetched_at propagates so staleness is visible
                    Some(snapshot) => {
                        warn!(error = %e, "Taxonomy refresh failed, serving cached snapshot");
                        Ok(snapshot.clone())
                    }
                    None => Err(e),
                }
            }
        }
    }
}
