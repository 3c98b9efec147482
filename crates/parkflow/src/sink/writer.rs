//! Parquet writer for a single partition file.
//!
//! Records are buffered in a [`TransactionBatchBuilder`] and encoded into the
//! open `AsyncArrowWriter` every `batch_rows` rows. Encoding happens in memory;
//! only flushed row groups and the footer touch the file, through `tokio::fs`.
//! Row groups are flushed once the writer's in-progress size passes
//! `row_group_size_bytes`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use arrow::datatypes::SchemaRef;
use parquet::arrow::AsyncArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use snafu::prelude::*;
use tracing::debug;

use super::batch::TransactionBatchBuilder;
use crate::config::{MB, ParquetCompression};
use crate::error::{
    BatchBuildSnafu, CloseSnafu, OpenFileSnafu, ParquetWriteSnafu, WriterCreateSnafu, WriterError,
};
use crate::partition::PartitionKey;
use crate::schema::TransactionRecord;

/// Configuration for partition writers.
#[derive(Debug, Clone)]
pub struct PartitionWriterConfig {
    /// Rows buffered before they are encoded into the file.
    pub batch_rows: usize,
    /// Row groups are flushed when in_progress_size exceeds this threshold.
    pub row_group_size_bytes: usize,
    /// Compression codec.
    pub compression: ParquetCompression,
}

impl Default for PartitionWriterConfig {
    fn default() -> Self {
        Self {
            batch_rows: 8192,
            row_group_size_bytes: 128 * MB,
            compression: ParquetCompression::Snappy,
        }
    }
}

impl PartitionWriterConfig {
    /// Set the number of rows buffered per batch.
    pub fn with_batch_rows(mut self, batch_rows: usize) -> Self {
        self.batch_rows = batch_rows.max(1);
        self
    }

    /// Set the row group size in bytes.
    pub fn with_row_group_size_bytes(mut self, size_bytes: usize) -> Self {
        self.row_group_size_bytes = size_bytes;
        self
    }

    /// Set the compression codec.
    pub fn with_compression(mut self, compression: ParquetCompression) -> Self {
        self.compression = compression;
        self
    }

    fn writer_properties(&self) -> WriterProperties {
        let compression = match self.compression {
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
            ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            ParquetCompression::Lz4 => Compression::LZ4,
        };

        WriterProperties::builder()
            .set_compression(compression)
            .build()
    }
}

/// Outcome of closing a partition file.
#[derive(Debug, Clone)]
pub struct ClosedFile {
    pub path: PathBuf,
    pub rows: u64,
    pub duration: Duration,
}

/// An open, appendable output file bound to one partition.
pub struct PartitionWriter {
    key: PartitionKey,
    path: PathBuf,
    writer: AsyncArrowWriter<tokio::fs::File>,
    builder: TransactionBatchBuilder,
    batch_rows: usize,
    row_group_size_bytes: usize,
    rows_written: u64,
}

impl PartitionWriter {
    /// Create the file at `path`, truncating any previous content.
    ///
    /// The parent directory must already exist.
    pub async fn create(
        key: PartitionKey,
        path: PathBuf,
        schema: SchemaRef,
        config: &PartitionWriterConfig,
    ) -> Result<Self, WriterError> {
        let display = path.display().to_string();
        let file = tokio::fs::File::create(&path)
            .await
            .context(OpenFileSnafu {
                path: display.clone(),
            })?;
        let writer = AsyncArrowWriter::try_new(file, schema, Some(config.writer_properties()))
            .context(WriterCreateSnafu { path: display })?;

        debug!(partition = %key, path = %path.display(), "Opened partition file");

        Ok(Self {
            key,
            path,
            writer,
            builder: TransactionBatchBuilder::with_capacity(config.batch_rows),
            batch_rows: config.batch_rows,
            row_group_size_bytes: config.row_group_size_bytes,
            rows_written: 0,
        })
    }

    pub fn key(&self) -> &PartitionKey {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended so far, buffered or encoded.
    pub fn rows(&self) -> u64 {
        self.rows_written + self.builder.len() as u64
    }

    /// Append one record.
    pub async fn append(&mut self, record: &TransactionRecord) -> Result<(), WriterError> {
        self.builder.append(record);
        if self.builder.len() >= self.batch_rows {
            self.write_buffered().await?;
        }
        Ok(())
    }

    async fn write_buffered(&mut self) -> Result<(), WriterError> {
        if self.builder.is_empty() {
            return Ok(());
        }

        let batch = self.builder.finish().context(BatchBuildSnafu)?;
        self.writer
            .write(&batch)
            .await
            .context(ParquetWriteSnafu {
                path: self.path.display().to_string(),
            })?;
        self.rows_written += batch.num_rows() as u64;

        let in_progress_size = self.writer.in_progress_size();
        if in_progress_size > self.row_group_size_bytes {
            debug!(
                partition = %self.key,
                in_progress_size,
                threshold = self.row_group_size_bytes,
                "Flushing row group"
            );
            self.writer.flush().await.context(ParquetWriteSnafu {
                path: self.path.display().to_string(),
            })?;
        }

        Ok(())
    }

    /// Encode any buffered rows, write the footer and release the file.
    ///
    /// The file handle is released even when writing fails.
    pub async fn close(mut self) -> Result<ClosedFile, WriterError> {
        let start = Instant::now();
        let path = self.path.display().to_string();

        self.write_buffered().await?;
        self.writer.close().await.context(CloseSnafu { path })?;

        debug!(
            partition = %self.key,
            rows = self.rows_written,
            path = %self.path.display(),
            "Closed partition file"
        );

        Ok(ClosedFile {
            path: self.path,
            rows: self.rows_written,
            duration: start.elapsed(),
        })
    }
}
