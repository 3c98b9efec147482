//! Progress reporting for a running ingestion.
//!
//! The driver hands a [`ProgressSnapshot`] to a [`ProgressSink`] every
//! `progress_interval_rows` processed rows. Sinks must return immediately;
//! a slow consumer loses snapshots instead of slowing the run down.

use serde::Serialize;
use tokio::sync::{mpsc, watch};

/// Point-in-time counters of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub bytes_read: u64,
    /// Expected input size, 0 when unknown.
    pub total_bytes: u64,
    pub processed: u64,
    pub failed: u64,
    /// `bytes_read / total_bytes * 100`, or 0 when the total is unknown.
    pub percentage: f64,
}

impl ProgressSnapshot {
    pub fn new(bytes_read: u64, total_bytes: Option<u64>, processed: u64, failed: u64) -> Self {
        let total_bytes = total_bytes.unwrap_or(0);
        let percentage = if total_bytes > 0 {
            bytes_read as f64 / total_bytes as f64 * 100.0
        } else {
            0.0
        };
        Self {
            bytes_read,
            total_bytes,
            processed,
            failed,
            percentage,
        }
    }
}

/// Receiver of progress snapshots. Implementations must not block.
pub trait ProgressSink: Send {
    fn report(&mut self, snapshot: ProgressSnapshot);
}

impl<F> ProgressSink for F
where
    F: FnMut(ProgressSnapshot) + Send,
{
    fn report(&mut self, snapshot: ProgressSnapshot) {
        self(snapshot)
    }
}

/// Latest value wins.
impl ProgressSink for watch::Sender<ProgressSnapshot> {
    fn report(&mut self, snapshot: ProgressSnapshot) {
        self.send_replace(snapshot);
    }
}

/// Snapshots are dropped while the channel is full or closed.
impl ProgressSink for mpsc::Sender<ProgressSnapshot> {
    fn report(&mut self, snapshot: ProgressSnapshot) {
        let _ = self.try_send(snapshot);
    }
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _snapshot: ProgressSnapshot) {}
}
