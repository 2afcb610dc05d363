use crate::classification::ClassificationContext;
use crate::config::OracleConfig;
use crate::error::{AppError, Result};
use crate::models::{CaseClassification, CaseEvent};
use crate::oracles::{ClassificationOracle, EnrichmentOracle, EnrichmentOutcome};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// HTTP client implementing both oracle seams.
///
/// The per-call reqwest timeout bounds a stuck oracle; a timeout surfaces
/// as an error outcome like any other oracle failure.
#[derive(Clone)]
pub struct HttpOracleClient {
    client: Client,
    classification_url: String,
    enrichment_url: String,
}

impl HttpOracleClient {
    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            classification_url: config.classification_url.clone(),
            enrichment_url: config.enrichment_url.clone(),
        })
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        debug!(url = url, "Oracle request");

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(format!("oracle call to {url}"))
                } else {
                    AppError::Oracle(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Oracle(format!(
                "status {}: {}",
                status.as_u16(),
                detail
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Oracle(format!("invalid response body: {}", e)))
    }
}

#[async_trait]
impl ClassificationOracle for HttpOracleClient {
    async fn classify(
        &self,
        event: &CaseEvent,
        context: &ClassificationContext,
    ) -> Result<CaseClassification> {
        let body = serde_json::json!({
            "case": event,
            "context": context,
        });
        self.post(&self.classification_url, body).await
    }
}

#[async_trait]
impl EnrichmentOracle for HttpOracleClient {
    async fn enrich_incident(&self, incident_id: &str) -> Result<EnrichmentOutcome> {
        let body = serde_json::json!({ "incident_id": incident_id });
        self.post(&self.enrichment_url, body).await
    }
}
