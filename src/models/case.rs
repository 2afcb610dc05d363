use serde::{Deserialize, Serialize};
use validator::Validate;

/// Inbound support case event delivered by the ticketing platform webhook.
///
/// Field names mirror the platform's case table. Record references
/// (`company`, `caller_id`, `business_service`, `assignment_group`) carry
/// opaque sys_ids; display values arrive separately where the platform
/// sends them.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CaseEvent {
    /// Case sys_id
    #[validate(length(min = 1))]
    pub sys_id: String,

    /// Human-facing case number (e.g. CS0012345)
    #[validate(length(min = 1))]
    pub number: String,

    /// Short description
    pub short_description: String,

    /// Full description
    #[serde(default)]
    pub description: String,

    /// Tenant/company sys_id, absent for cases with no account linkage
    #[serde(default)]
    pub company: Option<String>,

    /// Caller reference; expected to be a sys_id but some webhook payloads
    /// carry a display name instead
    #[serde(default)]
    pub caller_id: Option<String>,

    /// Business service reference on the case
    #[serde(default)]
    pub business_service: Option<String>,

    /// Assignment group at time of intake
    #[serde(default)]
    pub assignment_group: Option<String>,

    /// Case category at time of intake
    #[serde(default)]
    pub category: Option<String>,

    /// Priority at time of intake
    #[serde(default)]
    pub priority: Option<String>,

    /// Case state at time of intake
    #[serde(default)]
    pub state: Option<String>,

    /// Chat channel the case originated from, when webhook metadata has it
    #[serde(default)]
    pub channel_id: Option<String>,

    /// Chat thread timestamp, when present
    #[serde(default)]
    pub thread_ts: Option<String>,
}

impl CaseEvent {
    /// Whether the event carries a tenant identifier usable for
    /// application-service lookup
    pub fn has_company(&self) -> bool {
        self.company.as_deref().is_some_and(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_company() {
        let mut event: CaseEvent = serde_json::from_value(serde_json::json!({
            "sys_id": "a1b2",
            "number": "CS0000001",
            "short_description": "VPN down",
        }))
        .unwrap();

        assert!(!event.has_company());

        event.company = Some(String::new());
        assert!(!event.has_company());

        event.company = Some("acme-sys-id".to_string());
        assert!(event.has_company());
    }

    #[test]
    fn test_minimal_payload_deserializes() {
        let event: CaseEvent = serde_json::from_str(
            r#"{"sys_id":"x","number":"CS1","short_description":"printer on fire"}"#,
        )
        .unwrap();

        assert_eq!(event.number, "CS1");
        assert!(event.caller_id.is_none());
        assert!(event.channel_id.is_none());
    }
}
