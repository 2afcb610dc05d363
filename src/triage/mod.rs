pub mod processor;
pub mod storage;

pub use processor::{TriageOutcome, TriageProcessor};
pub use storage::TriageStorage;
