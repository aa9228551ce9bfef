//! Data models for run results
//!
//! Outcome of a single run and summaries over batches.

mod outcome;

pub use outcome::{BatchSummary, Outcome, RunStatus};
