//! Recurring enrichment of watchlisted incidents.
//!
//! Each trigger selects a batch of eligible entries, runs the enrichment
//! oracle on each sequentially, and advances the stage machine from the
//! oracle's outcome. A failure on one entry never aborts the batch; only a
//! failing selection query fails the run.

use crate::config::EnrichmentConfig;
use crate::error::Result;
use crate::models::EnrichmentStage;
use crate::oracles::EnrichmentOracle;
use crate::routing::RoutingContext;
use crate::storage::WatchlistStore;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Aggregate result of one scheduler run
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RunSummary {
    /// Entries an oracle run was attempted for
    pub processed: u64,

    /// Entries that reached the `enriched` stage
    pub enriched: u64,

    /// Entries moved to (or kept in) `clarification_pending`
    pub clarifications: u64,

    /// Entries whose oracle run failed
    pub errors: u64,

    /// Clarification entries skipped because their request has not expired
    pub skipped: u64,
}

/// Runs one enrichment batch per trigger
pub struct EnrichmentScheduler {
    watchlist: Arc<dyn WatchlistStore>,
    oracle: Arc<dyn EnrichmentOracle>,
    config: EnrichmentConfig,
}

impl EnrichmentScheduler {
    pub fn new(
        watchlist: Arc<dyn WatchlistStore>,
        oracle: Arc<dyn EnrichmentOracle>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            watchlist,
            oracle,
            config,
        }
    }

    /// Process one batch of eligible watchlist entries.
    ///
    /// Returns a zero summary immediately when the feature is disabled.
    /// Fails only when the eligibility selection itself fails; every
    /// per-entry failure is counted and the batch continues.
    pub async fn run(&self) -> Result<RunSummary> {
        if !self.config.enabled {
            debug!("Enrichment disabled, skipping run");
            return Ok(RunSummary::default());
        }

        let routing = RoutingContext::system("enrichment-watchlist");
        let now = Utc::now();
        let cutoff = now - Duration::minutes(self.config.effective_quiet_window_minutes());

        let batch = self
            .watchlist
            .select_eligible(
                EnrichmentStage::actively_processing(),
                cutoff,
                self.config.effective_batch_size(),
            )
            .await?;

        if batch.is_empty() {
            debug!("No watchlist entries eligible for enrichment");
            return Ok(RunSummary::default());
        }

        info!(
            actor = routing.actor_id.as_deref().unwrap_or("-"),
            batch = batch.len(),
            "Enrichment batch selected"
        );

        let mut summary = RunSummary::default();
        for mut entry in batch {
            // Open clarification requests wait out their expiry window
            if entry.stage == EnrichmentStage::ClarificationPending
                && !entry.clarification_expired(now)
            {
                debug!(
                    incident_number = %entry.incident_number,
                    age_hours = entry.clarification_age_hours(now).unwrap_or(0),
                    "Clarification still open, skipping"
                );
                summary.skipped += 1;
                continue;
            }

            summary.processed += 1;

            // An oracle failure is recoverable per incident: count it, keep
            // the entry in its current stage and let the next run retry once
            // the quiet window passes again.
            let outcome = match self.oracle.enrich_incident(&entry.incident_id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(
                        incident_number = %entry.incident_number,
                        error = %e,
                        "Enrichment oracle call failed"
                    );
                    summary.errors += 1;
                    self.keep_for_retry(&mut entry).await;
                    continue;
                }
            };

            if !outcome.success {
                warn!(
                    incident_number = %entry.incident_number,
                    message = outcome.message.as_deref().unwrap_or("-"),
                    "Enrichment reported failure"
                );
                summary.errors += 1;
                self.keep_for_retry(&mut entry).await;
                continue;
            }

            let next = if outcome.clarification_needed {
                info!(
                    incident_number = %entry.incident_number,
                    message = outcome.message.as_deref().unwrap_or("-"),
                    "Enrichment needs clarification"
                );
                summary.clarifications += 1;
                EnrichmentStage::ClarificationPending
            } else {
                // CI linked or nothing further to match; either way the
                // incident is as enriched as it can get
                info!(
                    incident_number = %entry.incident_number,
                    ci_linked = outcome.ci_linked,
                    ci = outcome.ci_name.as_deref().unwrap_or("-"),
                    "Incident enriched"
                );
                summary.enriched += 1;
                EnrichmentStage::Enriched
            };

            if let Some(ci) = outcome.ci_name.filter(|_| outcome.ci_linked) {
                if !entry.matched_assets.contains(&ci) {
                    entry.matched_assets.push(ci);
                }
            }

            // A rejected transition means the entry's state is corrupt;
            // unlike an oracle failure this is unrecoverable, so park it.
            if let Err(e) = entry.transition(next) {
                error!(
                    incident_number = %entry.incident_number,
                    error = %e,
                    "Stage transition rejected"
                );
                summary.errors += 1;
                self.mark_error(&mut entry).await;
                continue;
            }

            if let Err(e) = self.watchlist.update(&entry).await {
                error!(
                    incident_number = %entry.incident_number,
                    error = %e,
                    "Failed to persist watchlist entry"
                );
                summary.errors += 1;
            }
        }

        // Post-batch snapshot for the operator, never for control flow
        match self.watchlist.stats().await {
            Ok(stats) => info!(
                processed = summary.processed,
                enriched = summary.enriched,
                clarifications = summary.clarifications,
                errors = summary.errors,
                skipped = summary.skipped,
                watchlist_total = stats.total,
                watchlist_enriched = stats.count(EnrichmentStage::Enriched),
                watchlist_pending = stats.count(EnrichmentStage::ClarificationPending),
                "Enrichment run complete"
            ),
            Err(e) => warn!(error = %e, "Watchlist stats unavailable after run"),
        }

        Ok(summary)
    }

    /// Refresh the retry gate without changing stage, so the entry stays
    /// eligible for the run after the next quiet window
    async fn keep_for_retry(&self, entry: &mut crate::models::WatchlistEntry) {
        entry.touch();
        if let Err(e) = self.watchlist.update(entry).await {
            warn!(
                incident_number = %entry.incident_number,
                error = %e,
                "Failed to persist retry stamp"
            );
        }
    }

    /// Park an unrecoverable entry in the error stage. Best-effort; a
    /// terminal entry stays where it is.
    async fn mark_error(&self, entry: &mut crate::models::WatchlistEntry) {
        if entry.transition(EnrichmentStage::Error).is_ok() {
            if let Err(e) = self.watchlist.update(entry).await {
                warn!(
                    incident_number = %entry.incident_number,
                    error = %e,
                    "Failed to persist error stage"
                );
            }
        }
    }
}
