//! Command-line arguments for the `parkflow` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::config::IngestConfig;
use crate::error::ConfigError;

/// Convert a parking transaction CSV export into date-partitioned Parquet.
#[derive(Parser, Debug)]
#[command(name = "parkflow", version, about)]
pub struct CliArgs {
    /// CSV file to ingest
    #[arg(short, long, env = "INPUT_CSV")]
    pub input: PathBuf,

    /// Output directory for the partition tree
    #[arg(short, long, env = "OUTPUT_DIR")]
    pub output: PathBuf,

    /// Optional YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum partition files open at once (overrides the config file)
    #[arg(long)]
    pub max_open_writers: Option<usize>,

    /// Address for the Prometheus endpoint (overrides the config file)
    #[arg(long)]
    pub metrics_address: Option<String>,
}

impl CliArgs {
    /// Load the configuration file, if any, and apply the overrides.
    pub fn load_config(&self) -> Result<IngestConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => IngestConfig::from_file(path)?,
            None => IngestConfig::default(),
        };

        if let Some(max_open_writers) = self.max_open_writers {
            config.sink.max_open_writers = max_open_writers;
        }
        if let Some(address) = &self.metrics_address {
            config.metrics.address = Some(address.clone());
        }

        config.validate()?;
        Ok(config)
    }
}
