//! Webhook-driven support case triage and incident enrichment pipeline.
//!
//! Inbound case events are classified by an external oracle, written back
//! onto the ticket, and optionally escalated to Incident or Problem
//! records. Escalated incidents enter an enrichment watchlist that a
//! recurring scheduler advances through a stage machine until each incident
//! is enriched with its configuration items.

pub mod api;
pub mod classification;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod escalation;
pub mod models;
pub mod oracles;
pub mod routing;
pub mod storage;
pub mod ticketing;
pub mod triage;

pub use config::Config;
pub use error::{AppError, Result};
