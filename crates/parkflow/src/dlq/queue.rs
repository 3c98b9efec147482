//! Dead Letter Queue implementation.
//!
//! Appends rejected rows to a local NDJSON file for later inspection. Records
//! are buffered and written in batches; each run gets its own file named after
//! its target, start time and a random suffix.

use std::path::{Path, PathBuf};

use chrono::Utc;
use snafu::prelude::*;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::types::{FailureStats, RejectedRow};
use crate::config::ErrorHandlingConfig;
use crate::error::{
    DlqCreateDirSnafu, DlqError, DlqSerializeSnafu, DlqWriteSnafu, SchemaError,
};

/// Records buffered before they are appended to the file.
const BUFFER_SIZE: usize = 100;

/// Dead Letter Queue for rejected rows.
pub struct DeadLetterQueue {
    path: PathBuf,
    buffer: Vec<RejectedRow>,
    stats: FailureStats,
    buffer_size: usize,
}

impl DeadLetterQueue {
    /// Create a new DLQ from configuration.
    ///
    /// Returns `None` if no DLQ path is configured.
    pub async fn from_config(
        config: &ErrorHandlingConfig,
        target: &str,
    ) -> Result<Option<Self>, DlqError> {
        let Some(dlq_path) = &config.dlq_path else {
            return Ok(None);
        };

        let dlq = Self::in_dir(Path::new(dlq_path), target).await?;
        info!("DLQ enabled: {}", dlq.path.display());
        Ok(Some(dlq))
    }

    /// Create a DLQ writing a fresh file under `dir`.
    pub async fn in_dir(dir: &Path, target: &str) -> Result<Self, DlqError> {
        tokio::fs::create_dir_all(dir)
            .await
            .context(DlqCreateDirSnafu {
                path: dir.display().to_string(),
            })?;

        let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        let path = dir.join(format!(
            "rejected-{}-{timestamp}-{}.ndjson",
            file_safe(target),
            &suffix[..8]
        ));

        Ok(Self {
            path,
            buffer: Vec::new(),
            stats: FailureStats::default(),
            buffer_size: BUFFER_SIZE,
        })
    }

    /// Path of the NDJSON file this queue appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stats(&self) -> FailureStats {
        self.stats
    }

    /// Record a rejected row.
    pub async fn record_failure(&mut self, line_number: u64, line: &str, error: &SchemaError) {
        debug!(line = line_number, error = %error, "Recording DLQ failure");

        self.stats.increment(error);
        self.buffer.push(RejectedRow {
            line_number,
            error: error.to_string(),
            line: line.to_string(),
            timestamp: Utc::now(),
        });

        if self.buffer.len() >= self.buffer_size
            && let Err(e) = self.flush().await
        {
            error!("Failed to flush DLQ: {}", e);
        }
    }

    /// Append buffered records to the file.
    pub async fn flush(&mut self) -> Result<(), DlqError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let records = std::mem::take(&mut self.buffer);

        let count = records.len();
        debug!("Flushing {} DLQ records", count);

        let mut ndjson = String::new();
        for record in &records {
            let line = serde_json::to_string(record).context(DlqSerializeSnafu)?;
            ndjson.push_str(&line);
            ndjson.push('\n');
        }

        let path = self.path.display().to_string();
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .context(DlqWriteSnafu { path: path.clone() })?;
        file.write_all(ndjson.as_bytes())
            .await
            .context(DlqWriteSnafu { path: path.clone() })?;
        file.flush().await.context(DlqWriteSnafu { path })?;

        debug!("Flushed {} records to DLQ", count);
        Ok(())
    }

    /// Finalize the DLQ, flushing any remaining records.
    pub async fn finalize(&mut self) -> Result<(), DlqError> {
        self.flush().await?;
        let stats = self.stats;
        info!(
            "DLQ finalized: {} rejected rows (missing_field={}, column_count={}, invalid_integer={}, invalid_amount={}, invalid_timestamp={}, invalid_encoding={})",
            stats.total(),
            stats.missing_field,
            stats.column_count,
            stats.invalid_integer,
            stats.invalid_amount,
            stats.invalid_timestamp,
            stats.invalid_encoding
        );
        Ok(())
    }
}

/// Keep `target` usable as part of a file name.
fn file_safe(target: &str) -> String {
    target
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_records(path: &Path) -> Vec<RejectedRow> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_disabled_without_path() {
        let dlq = DeadLetterQueue::from_config(&ErrorHandlingConfig::default(), "test")
            .await
            .unwrap();
        assert!(dlq.is_none());
    }

    #[tokio::test]
    async fn test_records_are_written_on_finalize() {
        let dir = TempDir::new().unwrap();
        let config = ErrorHandlingConfig {
            dlq_path: Some(dir.path().join("dlq").display().to_string()),
            ..Default::default()
        };
        let mut dlq = DeadLetterQueue::from_config(&config, "test")
            .await
            .unwrap()
            .unwrap();

        dlq.record_failure(3, ",Parking Meter", &SchemaError::MissingField { column: "ID" })
            .await;
        assert!(!dlq.path().exists());

        dlq.finalize().await.unwrap();
        let records = read_records(dlq.path());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].line_number, 3);
        assert_eq!(records[0].line, ",Parking Meter");
        assert_eq!(records[0].error, "Missing required field 'ID'");
        assert_eq!(dlq.stats().missing_field, 1);
    }

    #[tokio::test]
    async fn test_flushes_when_buffer_fills() {
        let dir = TempDir::new().unwrap();
        let mut dlq = DeadLetterQueue::in_dir(dir.path(), "test").await.unwrap();
        let error = SchemaError::InvalidAmount {
            value: "abc".to_string(),
        };

        for line in 0..BUFFER_SIZE as u64 {
            dlq.record_failure(line + 2, "row", &error).await;
        }
        assert_eq!(read_records(dlq.path()).len(), BUFFER_SIZE);

        dlq.record_failure(500, "row", &error).await;
        dlq.finalize().await.unwrap();
        assert_eq!(read_records(dlq.path()).len(), BUFFER_SIZE + 1);
    }

    #[tokio::test]
    async fn test_queues_started_together_use_separate_files() {
        let dir = TempDir::new().unwrap();
        let error = SchemaError::MissingField { column: "ID" };

        let mut first = DeadLetterQueue::in_dir(dir.path(), "job-a").await.unwrap();
        let mut second = DeadLetterQueue::in_dir(dir.path(), "job-a").await.unwrap();
        assert_ne!(first.path(), second.path());

        first.record_failure(2, "first", &error).await;
        second.record_failure(2, "second", &error).await;
        first.finalize().await.unwrap();
        second.finalize().await.unwrap();

        assert_eq!(read_records(first.path())[0].line, "first");
        assert_eq!(read_records(second.path())[0].line, "second");
        assert_eq!(read_records(second.path()).len(), 1);
    }

    #[test]
    fn test_target_is_made_file_safe() {
        assert_eq!(file_safe("cli"), "cli");
        assert_eq!(file_safe("a/b c"), "a_b_c");
    }
}
