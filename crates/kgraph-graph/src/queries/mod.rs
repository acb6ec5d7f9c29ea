//! Read operations over the knowledge graph.

pub mod adhoc;
pub mod neighborhood;

pub use adhoc::{run_read_only, run_sanitized, QueryOutcome};
pub use neighborhood::neighborhood;
