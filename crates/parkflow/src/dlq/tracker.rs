//! Failure tracking with DLQ integration.
//!
//! Counts rejected rows, emits the failure metric, logs the first few
//! rejections and forwards every rejection to the DLQ when one is configured.

use tracing::{error, warn};

use parkflow_core::emit;
use parkflow_core::metrics::events::RowsFailed;

use super::DeadLetterQueue;
use crate::error::SchemaError;

/// Tracks rejected rows for one ingestion run.
pub struct FailureTracker {
    count: u64,
    /// Rejections logged individually before going quiet.
    log_limit: usize,
    dlq: Option<DeadLetterQueue>,
    /// Run identifier for metrics labeling.
    target: String,
}

impl FailureTracker {
    pub fn new(log_limit: usize, dlq: Option<DeadLetterQueue>, target: String) -> Self {
        Self {
            count: 0,
            log_limit,
            dlq,
            target,
        }
    }

    /// Record a rejected row.
    pub async fn record_failure(&mut self, line_number: u64, line: &str, error: &SchemaError) {
        self.count += 1;
        emit!(RowsFailed {
            count: 1,
            target: self.target.clone(),
        });

        if self.count <= self.log_limit as u64 {
            warn!(target = %self.target, line = line_number, error = %error, "Rejected row");
            if self.count == self.log_limit as u64 {
                warn!(target = %self.target, "Further rejected rows are not logged individually");
            }
        }

        if let Some(dlq) = &mut self.dlq {
            dlq.record_failure(line_number, line, error).await;
        }
    }

    /// Finalize DLQ, logging any errors.
    pub async fn finalize_dlq(&mut self) {
        if let Some(dlq) = &mut self.dlq
            && let Err(e) = dlq.finalize().await
        {
            error!("Failed to finalize DLQ: {}", e);
        }
    }

    /// Returns true if any failures were recorded.
    pub fn has_failures(&self) -> bool {
        self.count > 0
    }

    /// Returns the failure count.
    pub fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_counts_without_dlq() {
        let mut tracker = FailureTracker::new(1, None, "test".to_string());
        assert!(!tracker.has_failures());

        let error = SchemaError::MissingField { column: "ID" };
        tracker.record_failure(2, "", &error).await;
        tracker.record_failure(3, "", &error).await;

        assert!(tracker.has_failures());
        assert_eq!(tracker.count(), 2);
        tracker.finalize_dlq().await;
    }

    #[tokio::test]
    async fn test_forwards_to_dlq() {
        let dir = TempDir::new().unwrap();
        let dlq = DeadLetterQueue::in_dir(dir.path(), "test").await.unwrap();
        let path = dlq.path().to_path_buf();
        let mut tracker = FailureTracker::new(5, Some(dlq), "test".to_string());

        tracker
            .record_failure(4, "x", &SchemaError::InvalidEncoding { line: 4 })
            .await;
        tracker.finalize_dlq().await;

        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("\"lineNumber\":4"));
    }
}
