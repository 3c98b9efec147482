//! Internal events for parkflow metrics emission.
//!
//! Each event struct represents a measurable occurrence during ingestion and
//! implements `InternalEvent`, which records the matching Prometheus metric.
//! Every event carries a `target` label identifying the run or job.

use metrics::{counter, gauge, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Rows that passed validation and were appended to a partition file.
pub struct RowsProcessed {
    pub count: u64,
    pub target: String,
}

impl InternalEvent for RowsProcessed {
    fn emit(self) {
        trace!(count = self.count, target = %self.target, "Rows processed");
        counter!("parkflow_rows_processed_total", "target" => self.target).increment(self.count);
    }
}

/// Rows rejected by validation.
pub struct RowsFailed {
    pub count: u64,
    pub target: String,
}

impl InternalEvent for RowsFailed {
    fn emit(self) {
        trace!(count = self.count, target = %self.target, "Rows failed");
        counter!("parkflow_rows_failed_total", "target" => self.target).increment(self.count);
    }
}

/// Raw input bytes consumed from the source stream.
pub struct BytesRead {
    pub bytes: u64,
    pub target: String,
}

impl InternalEvent for BytesRead {
    fn emit(self) {
        trace!(bytes = self.bytes, target = %self.target, "Bytes read");
        counter!("parkflow_bytes_read_total", "target" => self.target).increment(self.bytes);
    }
}

/// A partition writer was opened.
pub struct PartitionWriterOpened {
    pub target: String,
}

impl InternalEvent for PartitionWriterOpened {
    fn emit(self) {
        trace!(target = %self.target, "Partition writer opened");
        counter!("parkflow_partition_writers_opened_total", "target" => self.target).increment(1);
    }
}

/// A partition writer was closed to stay under the open-writer cap.
pub struct PartitionWriterEvicted {
    pub target: String,
}

impl InternalEvent for PartitionWriterEvicted {
    fn emit(self) {
        trace!(target = %self.target, "Partition writer evicted");
        counter!("parkflow_partition_writers_evicted_total", "target" => self.target).increment(1);
    }
}

/// Current number of open partition writers.
pub struct OpenPartitionWriters {
    pub count: usize,
    pub target: String,
}

impl InternalEvent for OpenPartitionWriters {
    fn emit(self) {
        trace!(count = self.count, target = %self.target, "Open partition writers");
        gauge!("parkflow_open_partition_writers", "target" => self.target).set(self.count as f64);
    }
}

/// A partition file was flushed and closed.
pub struct PartitionFileClosed {
    pub duration: Duration,
    pub rows: u64,
    pub target: String,
}

impl InternalEvent for PartitionFileClosed {
    fn emit(self) {
        trace!(
            duration_ms = self.duration.as_millis(),
            rows = self.rows,
            target = %self.target,
            "Partition file closed"
        );
        histogram!("parkflow_partition_file_close_duration_seconds", "target" => self.target.clone())
            .record(self.duration.as_secs_f64());
        counter!("parkflow_partition_files_written_total", "target" => self.target).increment(1);
    }
}

/// An ingestion run completed normally.
pub struct IngestionCompleted {
    pub duration: Duration,
    pub target: String,
}

impl InternalEvent for IngestionCompleted {
    fn emit(self) {
        trace!(
            duration_ms = self.duration.as_millis(),
            target = %self.target,
            "Ingestion completed"
        );
        histogram!("parkflow_ingestion_duration_seconds", "target" => self.target)
            .record(self.duration.as_secs_f64());
    }
}

/// Why an ingestion run stopped early.
#[derive(Debug, Clone, Copy)]
pub enum AbortReason {
    Cancelled,
    Input,
    Output,
}

impl AbortReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbortReason::Cancelled => "cancelled",
            AbortReason::Input => "input",
            AbortReason::Output => "output",
        }
    }
}

/// An ingestion run was aborted by a fatal error.
pub struct IngestionAborted {
    pub reason: AbortReason,
    pub target: String,
}

impl InternalEvent for IngestionAborted {
    fn emit(self) {
        trace!(reason = self.reason.as_str(), target = %self.target, "Ingestion aborted");
        counter!(
            "parkflow_ingestion_aborted_total",
            "reason" => self.reason.as_str(),
            "target" => self.target
        )
        .increment(1);
    }
}
