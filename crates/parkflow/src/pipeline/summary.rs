//! Final result of a completed ingestion run.

use std::fmt;

use serde::Serialize;

/// Counters reported when a run completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    /// Rows normalized and written.
    pub processed: u64,
    /// Rows rejected by validation.
    pub failed: u64,
    pub duration_ms: u64,
    /// Distinct partitions written.
    pub partitions: usize,
    /// Partition files closed.
    pub files_written: u64,
    /// Writers closed early to stay under the open-writer cap.
    pub evictions: u64,
}

impl fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} failed={} duration_ms={} partitions={} files={} evictions={}",
            self.processed,
            self.failed,
            self.duration_ms,
            self.partitions,
            self.files_written,
            self.evictions
        )
    }
}
