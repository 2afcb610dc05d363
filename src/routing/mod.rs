//! Routing context construction.
//!
//! A [`RoutingContext`] is the identity token used for feature-flag
//! bucketing. It is threaded explicitly through every call; nothing here
//! stores ambient state, performs I/O, or generates random values, so the
//! same input always produces the same context across retries and process
//! restarts.

use crate::models::CaseEvent;
use serde::{Deserialize, Serialize};

/// Deterministic identity token for feature-flag bucketing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutingContext {
    /// Acting user, or a stable `system:<job-name>` string for background
    /// jobs
    pub actor_id: Option<String>,

    /// Channel the interaction originated from
    pub channel_id: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn string_field(obj: &serde_json::Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| non_empty(obj.get(*key).and_then(|v| v.as_str())))
}

impl RoutingContext {
    /// Context from an inbound case event
    pub fn from_event(event: &CaseEvent) -> Self {
        Self {
            actor_id: non_empty(event.caller_id.as_deref()),
            channel_id: non_empty(event.channel_id.as_deref()),
        }
    }

    /// Context from a chat message payload (`user`/`channel` fields)
    pub fn from_message(msg: &serde_json::Value) -> Self {
        Self {
            actor_id: string_field(msg, &["user", "user_id"]),
            channel_id: string_field(msg, &["channel", "channel_id"]),
        }
    }

    /// Context from any loosely-shaped payload, probing the common field
    /// names in order
    pub fn from_any(obj: &serde_json::Value) -> Self {
        Self {
            actor_id: string_field(obj, &["actor_id", "caller_id", "user", "user_id"]),
            channel_id: string_field(obj, &["channel_id", "channel"]),
        }
    }

    /// Context with explicitly supplied fields
    pub fn explicit(actor_id: Option<&str>, channel_id: Option<&str>) -> Self {
        Self {
            actor_id: non_empty(actor_id),
            channel_id: non_empty(channel_id),
        }
    }

    /// Context for a background job.
    ///
    /// Identical `job_name` yields an identical context, so the same logical
    /// job always lands in the same feature-flag bucket.
    pub fn system(job_name: &str) -> Self {
        Self {
            actor_id: Some(format!("system:{job_name}")),
            channel_id: None,
        }
    }

    /// Merge contexts left-to-right, keeping the first non-empty value per
    /// field
    pub fn merge<'a, I>(contexts: I) -> Self
    where
        I: IntoIterator<Item = &'a RoutingContext>,
    {
        let mut merged = Self::default();
        for ctx in contexts {
            if merged.actor_id.is_none() {
                merged.actor_id = ctx.actor_id.clone();
            }
            if merged.channel_id.is_none() {
                merged.channel_id = ctx.channel_id.clone();
            }
        }
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.actor_id.is_none() && self.channel_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case_event(caller: Option<&str>, channel: Option<&str>) -> CaseEvent {
        serde_json::from_value(serde_json::json!({
            "sys_id": "s1",
            "number": "CS1",
            "short_description": "test",
            "caller_id": caller,
            "channel_id": channel,
        }))
        .unwrap()
    }

    #[test]
    fn test_system_is_deterministic() {
        let a = RoutingContext::system("enrichment-watchlist");
        let b = RoutingContext::system("enrichment-watchlist");

        assert_eq!(a, b);
        assert_eq!(a.actor_id.as_deref(), Some("system:enrichment-watchlist"));
        assert!(a.channel_id.is_none());
    }

    #[test]
    fn test_from_event() {
        let ctx = RoutingContext::from_event(&case_event(Some("u123"), Some("C42")));
        assert_eq!(ctx.actor_id.as_deref(), Some("u123"));
        assert_eq!(ctx.channel_id.as_deref(), Some("C42"));

        let empty = RoutingContext::from_event(&case_event(None, None));
        assert!(empty.is_empty());
    }

    #[test]
    fn test_from_message() {
        let ctx = RoutingContext::from_message(&serde_json::json!({
            "user": "U99",
            "channel": "C99",
            "text": "hello",
        }));
        assert_eq!(ctx.actor_id.as_deref(), Some("U99"));
        assert_eq!(ctx.channel_id.as_deref(), Some("C99"));
    }

    #[test]
    fn test_from_any_probes_aliases() {
        let ctx = RoutingContext::from_any(&serde_json::json!({
            "caller_id": "U7",
            "channel": "C7",
        }));
        assert_eq!(ctx.actor_id.as_deref(), Some("U7"));
        assert_eq!(ctx.channel_id.as_deref(), Some("C7"));
    }

    #[test]
    fn test_blank_fields_propagate_as_empty() {
        let ctx = RoutingContext::explicit(Some("  "), None);
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_merge_first_non_empty_wins() {
        let a = RoutingContext::explicit(None, Some("C1"));
        let b = RoutingContext::explicit(Some("U2"), Some("C2"));
        let c = RoutingContext::system("job");

        let merged = RoutingContext::merge([&a, &b, &c]);
        assert_eq!(merged.actor_id.as_deref(), Some("U2"));
        assert_eq!(merged.channel_id.as_deref(), Some("C1"));
    }

    #[test]
    fn test_merge_of_empties_is_empty() {
        let merged = RoutingContext::merge([&RoutingContext::default(), &RoutingContext::default()]);
        assert!(merged.is_empty());
    }
}
