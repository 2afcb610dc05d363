pub mod scheduler;

pub use scheduler::{EnrichmentScheduler, RunSummary};
