//! Streaming ingestion driver.
//!
//! One run reads a single CSV stream start to finish on one control path:
//! read a chunk, split it into lines, normalize each line and append it to its
//! partition's writer. Row-level failures are counted and the run continues;
//! input and writer failures end it. Either way the writer pool is closed
//! before the run returns.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use parkflow_core::emit;
use parkflow_core::metrics::events::{
    AbortReason, BytesRead, IngestionAborted, IngestionCompleted, RowsProcessed,
};

use super::IngestOptions;
use super::progress::{ProgressSink, ProgressSnapshot};
use super::summary::IngestSummary;
use crate::dlq::{DeadLetterQueue, FailureTracker};
use crate::error::{IngestError, SchemaError, WriterError};
use crate::partition::PartitionKey;
use crate::schema::{RawRow, header_matches, normalize};
use crate::sink::{WriterPool, transaction_schema};
use crate::source::{LineSplitter, split_fields};

/// Lifecycle of an [`IngestionRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Aborted,
}

/// A single ingestion run over one input stream.
pub struct IngestionRun<'a, P: ProgressSink + ?Sized> {
    options: &'a IngestOptions,
    progress: &'a mut P,
    state: RunState,
    pool: WriterPool,
    failures: FailureTracker,
    splitter: LineSplitter,
    header_seen: bool,
    /// 1-based number of the last line taken from the splitter.
    line_number: u64,
    processed: u64,
    /// Processed rows already reported through the metrics counter.
    processed_emitted: u64,
    bytes_read: u64,
}

impl<'a, P: ProgressSink + ?Sized> IngestionRun<'a, P> {
    pub fn new(
        output_dir: &Path,
        options: &'a IngestOptions,
        dlq: Option<DeadLetterQueue>,
        progress: &'a mut P,
    ) -> Self {
        let pool = WriterPool::new(
            output_dir,
            transaction_schema(),
            options.sink.writer_config(),
            options.sink.max_open_writers,
            options.target.clone(),
        );
        let failures = FailureTracker::new(
            options.error_handling.log_failed_rows,
            dlq,
            options.target.clone(),
        );

        Self {
            options,
            progress,
            state: RunState::Idle,
            pool,
            failures,
            splitter: LineSplitter::new(),
            header_seen: false,
            line_number: 0,
            processed: 0,
            processed_emitted: 0,
            bytes_read: 0,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Consume `input` until end of stream, cancellation or a fatal error.
    ///
    /// A run can only be started once.
    pub async fn run<R>(
        &mut self,
        input: R,
        shutdown: CancellationToken,
    ) -> Result<IngestSummary, IngestError>
    where
        R: AsyncRead + Unpin,
    {
        if self.state != RunState::Idle {
            return Err(WriterError::PoolClosed.into());
        }
        self.state = RunState::Running;

        let start = Instant::now();
        info!(
            target = %self.options.target,
            output = %self.pool.root().display(),
            max_open_writers = self.pool.max_open_writers(),
            total_bytes = ?self.options.total_bytes,
            "Starting ingestion"
        );

        let outcome = self.consume(input, &shutdown).await;
        self.emit_processed();

        let closed = self.pool.close_all().await;
        self.failures.finalize_dlq().await;

        let result = match (outcome, closed) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(e)) => Err(IngestError::from(e)),
            (Err(e), closed) => {
                if let Err(close_error) = closed {
                    warn!(
                        target = %self.options.target,
                        error = %close_error,
                        "Failed to close partition writers after fatal error"
                    );
                }
                Err(e)
            }
        };

        match result {
            Ok(()) => {
                self.state = RunState::Completed;
                let duration = start.elapsed();
                let stats = self.pool.stats();
                let summary = IngestSummary {
                    processed: self.processed,
                    failed: self.failures.count(),
                    duration_ms: duration.as_millis() as u64,
                    partitions: stats.partitions,
                    files_written: stats.files_written,
                    evictions: stats.evictions,
                };

                emit!(IngestionCompleted {
                    duration,
                    target: self.options.target.clone(),
                });
                info!(target = %self.options.target, %summary, "Ingestion completed");
                Ok(summary)
            }
            Err(e) => {
                self.state = RunState::Aborted;
                let reason = match &e {
                    IngestError::Aborted { .. } => AbortReason::Cancelled,
                    IngestError::OpenInput { .. } | IngestError::ReadInput { .. } => {
                        AbortReason::Input
                    }
                    IngestError::Writer { .. } => AbortReason::Output,
                };
                emit!(IngestionAborted {
                    reason,
                    target: self.options.target.clone(),
                });
                warn!(
                    target = %self.options.target,
                    processed = self.processed,
                    failed = self.failures.count(),
                    error = %e,
                    "Ingestion aborted"
                );
                Err(e)
            }
        }
    }

    async fn consume<R>(&mut self, mut input: R, shutdown: &CancellationToken) -> Result<(), IngestError>
    where
        R: AsyncRead + Unpin,
    {
        let mut chunk = vec![0u8; self.options.source.chunk_size_bytes.max(1)];

        loop {
            let read = tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!(target = %self.options.target, "Shutdown requested, stopping ingestion");
                    return Err(self.aborted());
                }

                read = input.read(&mut chunk) => read,
            };

            let n = read.map_err(|source| self.read_error(source))?;
            if n == 0 {
                break;
            }

            self.bytes_read += n as u64;
            emit!(BytesRead {
                bytes: n as u64,
                target: self.options.target.clone(),
            });

            self.splitter.push(&chunk[..n]);
            while let Some(line) = self.splitter.next_line() {
                self.handle_line(&line).await?;
            }
        }

        if let Some(line) = self.splitter.finish() {
            self.handle_line(&line).await?;
        }

        Ok(())
    }

    async fn handle_line(&mut self, raw: &[u8]) -> Result<(), IngestError> {
        self.line_number += 1;
        let text = std::str::from_utf8(raw).ok();

        if text.is_some_and(|t| t.trim().is_empty()) {
            return Ok(());
        }

        if !self.header_seen {
            self.header_seen = true;
            self.check_header(text);
            return Ok(());
        }

        let Some(text) = text else {
            let error = SchemaError::InvalidEncoding {
                line: self.line_number,
            };
            let lossy = String::from_utf8_lossy(raw);
            self.failures
                .record_failure(self.line_number, &lossy, &error)
                .await;
            return Ok(());
        };

        let record = RawRow::from_fields(split_fields(text)).and_then(|row| normalize(&row));
        match record {
            Ok(record) => {
                let key = PartitionKey::from_start_time(&record.start_time);
                self.pool.append(&key, &record).await?;
                self.processed += 1;
                self.after_processed();
            }
            Err(error) => {
                self.failures
                    .record_failure(self.line_number, text, &error)
                    .await;
            }
        }

        Ok(())
    }

    fn check_header(&self, text: Option<&str>) {
        let matches = text.is_some_and(|t| header_matches(&split_fields(t)));
        if !matches {
            warn!(
                target = %self.options.target,
                header = text.unwrap_or("<invalid UTF-8>"),
                "Header does not match the expected columns, continuing with fixed column order"
            );
        } else {
            debug!(target = %self.options.target, "Header matches expected columns");
        }
    }

    fn after_processed(&mut self) {
        let progress_interval = self.options.source.progress_interval_rows;
        if progress_interval > 0 && self.processed % progress_interval == 0 {
            self.emit_processed();
            self.progress.report(ProgressSnapshot::new(
                self.bytes_read,
                self.options.total_bytes,
                self.processed,
                self.failures.count(),
            ));
        }

        let log_interval = self.options.source.log_interval_rows;
        if log_interval > 0 && self.processed % log_interval == 0 {
            info!(
                target = %self.options.target,
                open_writers = self.pool.open_count(),
                "Processed {} rows (failed {})",
                self.processed,
                self.failures.count()
            );
        }
    }

    fn emit_processed(&mut self) {
        let count = self.processed - self.processed_emitted;
        if count > 0 {
            emit!(RowsProcessed {
                count,
                target: self.options.target.clone(),
            });
            self.processed_emitted = self.processed;
        }
    }

    fn aborted(&self) -> IngestError {
        IngestError::Aborted {
            processed: self.processed,
            failed: self.failures.count(),
        }
    }

    fn read_error(&self, source: std::io::Error) -> IngestError {
        match source.kind() {
            ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset | ErrorKind::BrokenPipe => {
                info!(
                    target = %self.options.target,
                    error = %source,
                    "Input stream closed by upstream"
                );
                self.aborted()
            }
            _ => IngestError::ReadInput { source },
        }
    }
}
