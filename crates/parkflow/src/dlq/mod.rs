//! Dead Letter Queue for rejected rows.
//!
//! Rows that fail validation never stop a run. When a DLQ path is configured
//! they are written as NDJSON to a per-run file for later inspection and
//! correction.

mod queue;
mod tracker;
mod types;

pub use queue::DeadLetterQueue;
pub use tracker::FailureTracker;
pub use types::{FailureStats, RejectedRow};
