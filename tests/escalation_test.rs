mod common;

use common::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use triage_pipeline::escalation::RecordEscalationHandler;
use triage_pipeline::models::RecordTypeSuggestion;
use triage_pipeline::routing::RoutingContext;
use triage_pipeline::storage::{InMemoryWatchlistStore, WatchlistStore};

fn incident_suggestion() -> RecordTypeSuggestion {
    RecordTypeSuggestion::Incident {
        is_major_incident: false,
        reasoning: "service degradation across tenant".to_string(),
    }
}

fn handler(
    ticketing: MockTicketingClient,
    enrichment_enabled: bool,
) -> (
    Arc<MockTicketingClient>,
    Arc<InMemoryWatchlistStore>,
    RecordEscalationHandler,
) {
    let ticketing = Arc::new(ticketing);
    let watchlist = Arc::new(InMemoryWatchlistStore::new());
    let handler =
        RecordEscalationHandler::new(ticketing.clone(), watchlist.clone(), enrichment_enabled);
    (ticketing, watchlist, handler)
}

#[tokio::test]
async fn test_incident_creation_links_notes_and_registers() {
    let (ticketing, watchlist, handler) = handler(
        MockTicketingClient {
            offering: Some("offering-sys-id".to_string()),
            ..Default::default()
        },
        true,
    );

    let event = case_event("CS0200");
    let outcome = handler
        .handle(
            &incident_suggestion(),
            &classification(),
            &event,
            &RoutingContext::from_event(&event),
        )
        .await;

    assert!(outcome.incident_created);
    assert!(outcome.case_linked);
    assert!(outcome.audit_note_added);
    assert!(outcome.watchlist_registered);

    // Service offering resolved to its sys_id
    let incident = ticketing.last_incident();
    assert_eq!(incident.business_service.as_deref(), Some("offering-sys-id"));

    // Back-link carries the created incident's sys_id
    let (case_sys_id, fields) = ticketing.last_case_update();
    assert_eq!(case_sys_id, event.sys_id);
    assert_eq!(fields["incident"], "a1b2c3d4e5f60718293a4b5c6d7e8f90");

    // Audit note lands on the case table
    let notes = ticketing.work_notes.lock().unwrap();
    assert!(notes[0].0.starts_with("sn_customerservice_case:"));
    assert!(notes[0].1.contains("service degradation"));
    drop(notes);

    assert!(watchlist
        .get("a1b2c3d4e5f60718293a4b5c6d7e8f90")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_enrichment_disabled_skips_registration() {
    let (_, watchlist, handler) = handler(MockTicketingClient::default(), false);

    let event = case_event("CS0201");
    let outcome = handler
        .handle(
            &incident_suggestion(),
            &classification(),
            &event,
            &RoutingContext::from_event(&event),
        )
        .await;

    assert!(outcome.incident_created);
    assert!(!outcome.watchlist_registered);
    assert_eq!(watchlist.stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn test_create_failure_returns_empty_outcome_without_panicking() {
    let (ticketing, watchlist, handler) = handler(
        MockTicketingClient {
            fail_create_incident: true,
            ..Default::default()
        },
        true,
    );

    let event = case_event("CS0202");
    let outcome = handler
        .handle(
            &incident_suggestion(),
            &classification(),
            &event,
            &RoutingContext::from_event(&event),
        )
        .await;

    assert!(!outcome.incident_created);
    assert!(!outcome.case_linked);
    assert!(ticketing.case_updates.lock().unwrap().is_empty());
    assert_eq!(watchlist.stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn test_linking_failure_keeps_incident_and_continues() {
    let (ticketing, _, handler) = handler(
        MockTicketingClient {
            fail_update_case: true,
            ..Default::default()
        },
        true,
    );

    let event = case_event("CS0203");
    let outcome = handler
        .handle(
            &incident_suggestion(),
            &classification(),
            &event,
            &RoutingContext::from_event(&event),
        )
        .await;

    assert!(outcome.incident_created);
    assert!(!outcome.case_linked);
    assert!(outcome.audit_note_added);
    assert!(outcome.watchlist_registered);
    assert_eq!(ticketing.incident_count(), 1);
}

#[tokio::test]
async fn test_display_name_caller_is_reresolved() {
    let (ticketing, _, handler) = handler(
        MockTicketingClient {
            resolved_caller: Some(CALLER_SYS_ID.to_string()),
            ..Default::default()
        },
        true,
    );

    let mut event = case_event("CS0204");
    event.caller_id = Some("Jane Doe".to_string());

    handler
        .handle(
            &incident_suggestion(),
            &classification(),
            &event,
            &RoutingContext::from_event(&event),
        )
        .await;

    assert_eq!(ticketing.get_case_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        ticketing.last_incident().caller_id.as_deref(),
        Some(CALLER_SYS_ID)
    );
}

#[tokio::test]
async fn test_caller_refetch_failure_still_creates_incident() {
    let (ticketing, _, handler) = handler(
        MockTicketingClient {
            fail_get_case: true,
            ..Default::default()
        },
        true,
    );

    let mut event = case_event("CS0209");
    event.caller_id = Some("Jane Doe".to_string());

    let outcome = handler
        .handle(
            &incident_suggestion(),
            &classification(),
            &event,
            &RoutingContext::from_event(&event),
        )
        .await;

    assert!(outcome.incident_created);
    assert_eq!(ticketing.get_case_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        ticketing.last_incident().caller_id.as_deref(),
        Some("Jane Doe")
    );
}

#[tokio::test]
async fn test_caller_refetch_without_sys_id_keeps_original() {
    // get_case answers, but the record carries no usable caller sys_id
    let (ticketing, _, handler) = handler(MockTicketingClient::default(), true);

    let mut event = case_event("CS0210");
    event.caller_id = Some("Jane Doe".to_string());

    let outcome = handler
        .handle(
            &incident_suggestion(),
            &classification(),
            &event,
            &RoutingContext::from_event(&event),
        )
        .await;

    assert!(outcome.incident_created);
    assert_eq!(ticketing.get_case_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        ticketing.last_incident().caller_id.as_deref(),
        Some("Jane Doe")
    );
}

#[tokio::test]
async fn test_sys_id_caller_passes_through_without_lookup() {
    let (ticketing, _, handler) = handler(MockTicketingClient::default(), true);

    let event = case_event("CS0205");
    handler
        .handle(
            &incident_suggestion(),
            &classification(),
            &event,
            &RoutingContext::from_event(&event),
        )
        .await;

    assert_eq!(ticketing.get_case_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        ticketing.last_incident().caller_id.as_deref(),
        Some(CALLER_SYS_ID)
    );
}

#[tokio::test]
async fn test_offering_lookup_failure_keeps_case_reference() {
    let (ticketing, _, handler) = handler(
        MockTicketingClient {
            fail_offering_lookup: true,
            ..Default::default()
        },
        true,
    );

    let event = case_event("CS0206");
    handler
        .handle(
            &incident_suggestion(),
            &classification(),
            &event,
            &RoutingContext::from_event(&event),
        )
        .await;

    assert_eq!(
        ticketing.last_incident().business_service.as_deref(),
        Some("Email Hosting")
    );
}

#[tokio::test]
async fn test_problem_suggestion_creates_problem_without_watchlist() {
    let (ticketing, watchlist, handler) = handler(MockTicketingClient::default(), true);

    let event = case_event("CS0207");
    let outcome = handler
        .handle(
            &RecordTypeSuggestion::Problem {
                reasoning: "recurring across five cases".to_string(),
            },
            &classification(),
            &event,
            &RoutingContext::from_event(&event),
        )
        .await;

    assert!(outcome.problem_created);
    assert_eq!(outcome.problem_number.as_deref(), Some("PRB0007"));
    assert!(outcome.audit_note_added);
    assert!(!outcome.incident_created);
    assert!(!outcome.watchlist_registered);
    assert_eq!(ticketing.problems.lock().unwrap().len(), 1);
    assert_eq!(watchlist.stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn test_change_suggestion_is_log_only() {
    let (ticketing, watchlist, handler) = handler(MockTicketingClient::default(), true);

    let event = case_event("CS0208");
    let outcome = handler
        .handle(
            &RecordTypeSuggestion::Change {
                reasoning: "planned maintenance needed".to_string(),
            },
            &classification(),
            &event,
            &RoutingContext::from_event(&event),
        )
        .await;

    assert!(!outcome.incident_created);
    assert!(!outcome.problem_created);
    assert_eq!(ticketing.incident_count(), 0);
    assert!(ticketing.problems.lock().unwrap().is_empty());
    assert_eq!(watchlist.stats().await.unwrap().total, 0);
}
