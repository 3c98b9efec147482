//! Streaming CSV to partitioned Parquet ingestion.
//!
//! [`ingest`] drives one input stream through line splitting, normalization
//! and the partition writer pool. [`ingest_file`] does the same for a file on
//! disk and uses its size as the progress total.

mod driver;
mod progress;
mod summary;

use std::path::Path;

use snafu::prelude::*;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::{ErrorHandlingConfig, IngestConfig, SinkConfig, SourceConfig};
use crate::dlq::DeadLetterQueue;
use crate::error::{IngestError, OpenInputSnafu};

pub use driver::{IngestionRun, RunState};
pub use progress::{NoProgress, ProgressSink, ProgressSnapshot};
pub use summary::IngestSummary;

/// Settings for a single ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub source: SourceConfig,
    pub sink: SinkConfig,
    pub error_handling: ErrorHandlingConfig,
    /// Expected input size for progress percentages.
    pub total_bytes: Option<u64>,
    /// Run identifier used in logs and metric labels.
    pub target: String,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            sink: SinkConfig::default(),
            error_handling: ErrorHandlingConfig::default(),
            total_bytes: None,
            target: "ingest".to_string(),
        }
    }
}

impl IngestOptions {
    /// Options taken from the loaded configuration.
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            source: config.source.clone(),
            sink: config.sink.clone(),
            error_handling: config.error_handling.clone(),
            ..Default::default()
        }
    }

    /// Set the open-writer cap. Zero is treated as one.
    pub fn with_max_open_writers(mut self, max_open_writers: usize) -> Self {
        self.sink.max_open_writers = max_open_writers.max(1);
        self
    }

    pub fn with_total_bytes(mut self, total_bytes: Option<u64>) -> Self {
        self.total_bytes = total_bytes;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

/// Ingest a CSV stream into date partitions under `output_dir`.
///
/// Row-level failures are counted in the summary. Input, writer and
/// cancellation failures abort the run; in every case the partition files
/// opened so far are flushed and closed before this returns.
pub async fn ingest<R, P>(
    input: R,
    output_dir: &Path,
    options: &IngestOptions,
    progress: &mut P,
    shutdown: CancellationToken,
) -> Result<IngestSummary, IngestError>
where
    R: AsyncRead + Unpin,
    P: ProgressSink + ?Sized,
{
    let dlq = match DeadLetterQueue::from_config(&options.error_handling, &options.target).await {
        Ok(dlq) => dlq,
        Err(e) => {
            warn!(target = %options.target, error = %e, "DLQ unavailable, rejected rows will only be counted");
            None
        }
    };

    IngestionRun::new(output_dir, options, dlq, progress)
        .run(input, shutdown)
        .await
}

/// Ingest the CSV file at `path`.
///
/// When `options` carries no size hint, the file length is used.
pub async fn ingest_file<P>(
    path: &Path,
    output_dir: &Path,
    options: &IngestOptions,
    progress: &mut P,
    shutdown: CancellationToken,
) -> Result<IngestSummary, IngestError>
where
    P: ProgressSink + ?Sized,
{
    let file = tokio::fs::File::open(path).await.context(OpenInputSnafu {
        path: path.display().to_string(),
    })?;

    let mut options = options.clone();
    if options.total_bytes.is_none() {
        options.total_bytes = file.metadata().await.ok().map(|m| m.len());
    }

    ingest(file, output_dir, &options, progress, shutdown).await
}
