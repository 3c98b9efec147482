//! Configuration for the parkflow ingester.

use std::path::Path;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::error::{ConfigError, InvalidSnafu};
use crate::sink::{DEFAULT_MAX_OPEN_WRITERS, PartitionWriterConfig};
pub use parkflow_core::config::{
    InterpolationResult, MetricsConfig, ParquetCompression, interpolate,
};
pub use parkflow_core::{KB, MB};

/// Configuration for reading the CSV input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Bytes requested from the input per read.
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: usize,
    /// Processed rows between progress notifications.
    #[serde(default = "default_progress_interval")]
    pub progress_interval_rows: u64,
    /// Processed rows between progress log lines.
    #[serde(default = "default_log_interval")]
    pub log_interval_rows: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: default_chunk_size(),
            progress_interval_rows: default_progress_interval(),
            log_interval_rows: default_log_interval(),
        }
    }
}

fn default_chunk_size() -> usize {
    64 * KB
}

fn default_progress_interval() -> u64 {
    1000
}

fn default_log_interval() -> u64 {
    100_000
}

/// Configuration for the partitioned Parquet output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkConfig {
    /// Maximum partition files open at once.
    #[serde(default = "default_max_open_writers")]
    pub max_open_writers: usize,
    /// Rows buffered per partition before encoding.
    #[serde(default = "default_batch_rows")]
    pub batch_rows: usize,
    /// Row group size in bytes for memory management.
    #[serde(default = "default_row_group_size")]
    pub row_group_size_bytes: usize,
    /// Parquet compression codec.
    #[serde(default)]
    pub compression: ParquetCompression,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            max_open_writers: default_max_open_writers(),
            batch_rows: default_batch_rows(),
            row_group_size_bytes: default_row_group_size(),
            compression: ParquetCompression::default(),
        }
    }
}

impl SinkConfig {
    pub fn writer_config(&self) -> PartitionWriterConfig {
        PartitionWriterConfig::default()
            .with_batch_rows(self.batch_rows)
            .with_row_group_size_bytes(self.row_group_size_bytes)
            .with_compression(self.compression)
    }
}

fn default_max_open_writers() -> usize {
    DEFAULT_MAX_OPEN_WRITERS
}

fn default_batch_rows() -> usize {
    8192
}

fn default_row_group_size() -> usize {
    128 * MB
}

/// Handling of rejected rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorHandlingConfig {
    /// Number of rejected rows logged individually.
    #[serde(default = "default_log_failed_rows")]
    pub log_failed_rows: usize,
    /// Directory for the rejected-row file. Disabled when unset.
    #[serde(default)]
    pub dlq_path: Option<String>,
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            log_failed_rows: default_log_failed_rows(),
            dlq_path: None,
        }
    }
}

fn default_log_failed_rows() -> usize {
    5
}

/// Main configuration for parkflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub error_handling: ErrorHandlingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl IngestConfig {
    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = parkflow_core::load_yaml(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = parkflow_core::parse_yaml(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(
            self.sink.max_open_writers >= 1,
            InvalidSnafu {
                message: "sink.max_open_writers must be at least 1",
            }
        );
        ensure!(
            self.sink.batch_rows >= 1,
            InvalidSnafu {
                message: "sink.batch_rows must be at least 1",
            }
        );
        ensure!(
            self.source.chunk_size_bytes >= 1,
            InvalidSnafu {
                message: "source.chunk_size_bytes must be at least 1",
            }
        );
        ensure!(
            self.source.progress_interval_rows >= 1,
            InvalidSnafu {
                message: "source.progress_interval_rows must be at least 1",
            }
        );
        if let Some(path) = &self.error_handling.dlq_path {
            ensure!(
                !path.is_empty(),
                InvalidSnafu {
                    message: "error_handling.dlq_path must not be empty",
                }
            );
        }
        Ok(())
    }
}
