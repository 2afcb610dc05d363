pub mod case;
pub mod classification;
pub mod triage;
pub mod watchlist;

pub use case::*;
pub use classification::*;
pub use triage::*;
pub use watchlist::*;
