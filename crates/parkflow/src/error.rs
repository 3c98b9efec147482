//! Error types for the parkflow ingester.
//!
//! Errors come in two families that must never be mixed:
//! - [`SchemaError`] is scoped to one input row. The driver counts it and moves on.
//! - [`WriterError`] and [`IngestError`] are fatal to the whole run and always
//!   reach the caller, after every open partition writer has been closed.

use snafu::prelude::*;

// Re-export common errors
pub use parkflow_core::error::{ConfigError, InvalidSnafu, MetricsError};

/// A single row failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum SchemaError {
    /// A required column is empty or absent.
    #[snafu(display("Missing required field '{column}'"))]
    MissingField { column: &'static str },

    /// The line has more fields than the schema defines.
    #[snafu(display("Expected at most {expected} fields, found {found}"))]
    ColumnCount { expected: usize, found: usize },

    /// An integer column did not parse or is out of range.
    #[snafu(display("Invalid integer in '{column}': {value:?}"))]
    InvalidInteger { column: &'static str, value: String },

    /// The amount is not a finite decimal number that fits in minor units.
    #[snafu(display("Invalid amount: {value:?}"))]
    InvalidAmount { value: String },

    /// A timestamp column is not a valid calendar date-time.
    #[snafu(display("Invalid datetime in '{column}': {value:?}"))]
    InvalidTimestamp { column: &'static str, value: String },

    /// The line is not valid UTF-8.
    #[snafu(display("Line {line} is not valid UTF-8"))]
    InvalidEncoding { line: u64 },
}

/// Errors raised by the partition writer pool. All of them abort the run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WriterError {
    /// Failed to create a partition directory.
    #[snafu(display("Failed to create partition directory {path}: {source}"))]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    /// Failed to open a partition file.
    #[snafu(display("Failed to open partition file {path}: {source}"))]
    OpenFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to create the Parquet writer.
    #[snafu(display("Failed to create Parquet writer for {path}: {source}"))]
    WriterCreate {
        path: String,
        source: parquet::errors::ParquetError,
    },

    /// Failed to assemble a record batch from buffered rows.
    #[snafu(display("Failed to build record batch: {source}"))]
    BatchBuild { source: arrow::error::ArrowError },

    /// Failed to write to a partition file.
    #[snafu(display("Failed to write to Parquet file {path}: {source}"))]
    ParquetWrite {
        path: String,
        source: parquet::errors::ParquetError,
    },

    /// Failed to flush and close a partition file.
    #[snafu(display("Failed to close Parquet file {path}: {source}"))]
    Close {
        path: String,
        source: parquet::errors::ParquetError,
    },

    /// The pool was used after `close_all`.
    #[snafu(display("Writer pool is closed"))]
    PoolClosed,
}

/// Top-level ingestion errors. Every variant is fatal to the run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum IngestError {
    /// The input could not be opened.
    #[snafu(display("Failed to open input {path}: {source}"))]
    OpenInput {
        path: String,
        source: std::io::Error,
    },

    /// Reading the input failed mid-stream.
    #[snafu(display("Failed to read input: {source}"))]
    ReadInput { source: std::io::Error },

    /// The caller cancelled the run or the upstream went away.
    #[snafu(display("Ingestion aborted after {processed} processed and {failed} failed rows"))]
    Aborted { processed: u64, failed: u64 },

    /// The partition writer pool failed.
    #[snafu(display("Writer error: {source}"))]
    Writer { source: WriterError },
}

impl IngestError {
    /// True when the run was cancelled rather than broken.
    pub fn is_aborted(&self) -> bool {
        matches!(self, IngestError::Aborted { .. })
    }
}

impl From<WriterError> for IngestError {
    fn from(source: WriterError) -> Self {
        IngestError::Writer { source }
    }
}

/// Errors from the rejected-row file. These are logged, never propagated.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DlqError {
    /// Failed to create the DLQ directory.
    #[snafu(display("Failed to create DLQ directory {path}: {source}"))]
    DlqCreateDir {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize a rejected row.
    #[snafu(display("Failed to serialize DLQ record: {source}"))]
    DlqSerialize { source: serde_json::Error },

    /// Failed to append to the DLQ file.
    #[snafu(display("Failed to write DLQ file {path}: {source}"))]
    DlqWrite {
        path: String,
        source: std::io::Error,
    },
}

/// Errors from the import job layer.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum JobError {
    /// The requested status change is not allowed from the current status.
    #[snafu(display("Cannot move job from {from} to {to}"))]
    InvalidTransition {
        from: crate::jobs::JobStatus,
        to: crate::jobs::JobStatus,
    },

    /// No job with this id exists.
    #[snafu(display("Job not found: {id}"))]
    NotFound { id: String },

    /// Staging the uploaded body to disk failed.
    #[snafu(display("Failed to stage upload to {path}: {source}"))]
    Stage {
        path: String,
        source: std::io::Error,
    },

    /// Conversion of the staged upload failed.
    #[snafu(display("Ingestion failed: {source}"))]
    Ingest { source: IngestError },
}

impl From<IngestError> for JobError {
    fn from(source: IngestError) -> Self {
        JobError::Ingest { source }
    }
}
