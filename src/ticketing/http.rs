use crate::config::TicketingConfig;
use crate::error::{AppError, Result};
use crate::ticketing::{
    ApplicationService, CaseRecord, CreatedRecord, NewIncident, NewProblem, RecordTable,
    TicketingClient,
};
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::debug;

/// REST client for the platform's table endpoints
/// (`/api/now/table/{table}`, basic auth, `result` envelope).
#[derive(Clone)]
pub struct HttpTicketingClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl HttpTicketingClient {
    /// Build a client from configuration, resolving credentials from the
    /// configured environment variables.
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

        Self::new(&config.base_url, username, password, config.timeout_secs)
    }

    pub fn new(
        base_url: &str,
        username: String,
        password: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
        })
    }

    async fn request(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(operation = operation, method = %method, url = %url, "Ticketing request");

        let mut request = self
            .client
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password));

        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
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
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Ticketing {
                operation: operation.to_string(),
                message: format!("status {}: {}", status.as_u16(), detail),
            });
        }

        response.json().await.map_err(|e| AppError::Ticketing {
            operation: operation.to_string(),
            message: format!("invalid response body: {}", e),
        })
    }

    /// Unwrap the platform's `result` envelope
    fn extract_result(operation: &str, payload: serde_json::Value) -> Result<serde_json::Value> {
        payload
            .get("result")
            .cloned()
            .ok_or_else(|| AppError::Ticketing {
                operation: operation.to_string(),
                message: "response missing 'result'".to_string(),
            })
    }

    fn parse<T: serde::de::DeserializeOwned>(
        operation: &str,
        result: serde_json::Value,
    ) -> Result<T> {
        serde_json::from_value(result).map_err(|e| AppError::Ticketing {
            operation: operation.to_string(),
            message: format!("unexpected record shape: {}", e),
        })
    }
}

#[async_trait]
impl TicketingClient for HttpTicketingClient {
    async fn get_case(&self, sys_id: &str) -> Result<CaseRecord> {
        let operation = "get_case";
        let path = format!("/api/now/table/{}/{}", RecordTable::Case.table_name(), sys_id);
        let payload = self.request(operation, Method::GET, &path, None, None).await?;
        Self::parse(operation, Self::extract_result(operation, payload)?)
    }

    async fn create_incident(&self, incident: &NewIncident) -> Result<CreatedRecord> {
        let operation = "create_incident";
        let path = format!("/api/now/table/{}", RecordTable::Incident.table_name());
        let body = serde_json::to_value(incident)?;
        let payload = self
            .request(operation, Method::POST, &path, None, Some(body))
            .await?;
        Self::parse(operation, Self::extract_result(operation, payload)?)
    }

    async fn create_problem(&self, problem: &NewProblem) -> Result<CreatedRecord> {
        let operation = "create_problem";
        let path = format!("/api/now/table/{}", RecordTable::Problem.table_name());
        let body = serde_json::to_value(problem)?;
        let payload = self
            .request(operation, Method::POST, &path, None, Some(body))
            .await?;
        Self::parse(operation, Self::extract_result(operation, payload)?)
    }

    async fn update_case(&self, sys_id: &str, fields: serde_json::Value) -> Result<()> {
        let operation = "update_case";
        let path = format!("/api/now/table/{}/{}", RecordTable::Case.table_name(), sys_id);
        self.request(operation, Method::PATCH, &path, None, Some(fields))
            .await?;
        Ok(())
    }

    async fn add_work_note(&self, table: RecordTable, sys_id: &str, note: &str) -> Result<()> {
        let operation = "add_work_note";
        let path = format!("/api/now/table/{}/{}", table.table_name(), sys_id);
        let body = serde_json::json!({ "work_notes": note });
        self.request(operation, Method::PATCH, &path, None, Some(body))
            .await?;
        Ok(())
    }

    async fn lookup_service_offering(&self, name: &str) -> Result<Option<String>> {
        let operation = "lookup_service_offering";
        let query = format!("name={}", name);
        let payload = self
            .request(
                operation,
                Method::GET,
                "/api/now/table/service_offering",
                Some(&[
                    ("sysparm_query", query.as_str()),
                    ("sysparm_limit", "1"),
                    ("sysparm_fields", "sys_id,name"),
                ]),
                None,
            )
            .await?;

        let result = Self::extract_result(operation, payload)?;
        let records: Vec<serde_json::Value> = Self::parse(operation, result)?;
        Ok(records
            .first()
            .and_then(|record| record.get("sys_id"))
            .and_then(|v| v.as_str())
            .map(String::from))
    }

    async fn list_application_services(&self, company_id: &str) -> Result<Vec<ApplicationService>> {
        let operation = "list_application_services";
        let query = format!("company={}", company_id);
        let payload = self
            .request(
                operation,
                Method::GET,
                "/api/now/table/cmdb_ci_service_auto",
                Some(&[
                    ("sysparm_query", query.as_str()),
                    ("sysparm_limit", "200"),
                    ("sysparm_fields", "sys_id,name"),
                ]),
                None,
            )
            .await?;

        let result = Self::extract_result(operation, payload)?;
        Self::parse(operation, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> HttpTicketingClient {
        HttpTicketingClient::new(base_url, "svc".to_string(), "secret".to_string(), 5).unwrap()
    }

    #[tokio::test]
    async fn test_get_case_unwraps_envelope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/now/table/sn_customerservice_case/abc123")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"result":{"sys_id":"abc123","number":"CS0042","caller_id":"u1"}}"#,
            )
            .create_async()
            .await;

        let case = client(&server.url()).get_case("abc123").await.unwrap();
        mock.assert_async().await;

        assert_eq!(case.number, "CS0042");
        assert_eq!(case.caller_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_create_incident_posts_and_parses() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/now/table/incident")
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result":{"sys_id":"inc-sys","number":"INC0099"}}"#)
            .create_async()
            .await;

        let created = client(&server.url())
            .create_incident(&NewIncident {
                short_description: "outage".to_string(),
                description: "details".to_string(),
                category: "network".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        mock.assert_async().await;

        assert_eq!(created.number, "INC0099");
    }

    #[tokio::test]
    async fn test_error_status_maps_to_ticketing_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/now/table/sn_customerservice_case/missing")
            .with_status(404)
            .with_body(r#"{"error":{"message":"No Record found"}}"#)
            .create_async()
            .await;

        let err = client(&server.url()).get_case("missing").await.unwrap_err();
        assert!(matches!(err, AppError::Ticketing { .. }));
    }

    #[tokio::test]
    async fn test_lookup_service_offering_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/now/table/service_offering")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"result":[]}"#)
            .create_async()
            .await;

        let found = client(&server.url())
            .lookup_service_offering("Email Hosting")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_missing_result_envelope_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/now/table/sn_customerservice_case/abc")
            .with_status(200)
            .with_body(r#"{"data":{}}"#)
            .create_async()
            .await;

        let err = client(&server.url()).get_case("abc").await.unwrap_err();
        assert!(err.to_string().contains("result"));
    }
}
