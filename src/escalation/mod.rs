pub mod handler;

pub use handler::{EscalationOutcome, RecordEscalationHandler};
