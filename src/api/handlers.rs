use crate::api::AppState;
use crate::error::Result;
use crate::models::CaseEvent;
use crate::triage::TriageOutcome;
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use validator::Validate;

/// Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Triage an inbound case event
pub async fn submit_case(
    State(state): State<AppState>,
    Json(event): Json<CaseEvent>,
) -> Result<Json<TriageResponse>> {
    event.validate()?;

    let outcome = state.processor.process_case(&event).await?;

    Ok(Json(TriageResponse {
        case_number: event.number,
        outcome,
    }))
}

#[derive(Debug, Serialize)]
pub struct TriageResponse {
    pub case_number: String,

    #[serde(flatten)]
    pub outcome: TriageOutcome,
}

/// Trigger one enrichment scheduler run.
///
/// A completed run answers 200 with its counters even when individual
/// entries failed; only a run that could not start at all answers 500.
pub async fn run_enrichment(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.scheduler.run().await {
        Ok(summary) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "processed": summary.processed,
                "enriched": summary.enriched,
                "clarifications": summary.clarifications,
                "errors": summary.errors,
                "skipped": summary.skipped,
            })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "error",
                "message": e.to_string(),
            })),
        ),
    }
}

/// Watchlist counts by stage
pub async fn watchlist_stats(State(state): State<AppState>) -> Result<Json<Value>> {
    let stats = state.watchlist.stats().await?;
    Ok(Json(json!({
        "total": stats.total,
        "by_stage": stats.by_stage,
    })))
}
