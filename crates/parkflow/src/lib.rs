//! parkflow: streams parking transaction CSV exports into date-partitioned
//! Parquet files.
//!
//! This crate handles:
//! - Splitting a chunked byte stream into CSV lines and fields
//! - Validating and normalizing rows into typed transaction records
//! - Routing records to `YYYY/MM/DD` partitions through a bounded writer pool
//! - Recording rejected rows in a dead letter queue
//! - Tracking CSV import jobs from upload to conversion

pub mod cli;
pub mod config;
pub mod dlq;
pub mod error;
pub mod jobs;
pub mod partition;
pub mod pipeline;
pub mod schema;
pub mod sink;
pub mod source;

// Re-export commonly used items
pub use cli::CliArgs;
pub use config::IngestConfig;
pub use error::{IngestError, JobError, SchemaError, WriterError};
pub use jobs::{ImportJob, ImportRunner, JobRegistry, JobStatus};
pub use partition::PartitionKey;
pub use pipeline::{
    IngestOptions, IngestSummary, IngestionRun, NoProgress, ProgressSink, ProgressSnapshot,
    RunState, ingest, ingest_file,
};
pub use schema::{RawRow, TransactionRecord, normalize};

// Re-export from parkflow-core
pub use parkflow_core::{
    KB, MB, MetricsConfig, ParquetCompression, cancel_on_shutdown, init_metrics, init_tracing,
    shutdown_signal,
};
