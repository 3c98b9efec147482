//! parkflow-core: shared components for the parkflow ingestion crates.
//!
//! - `config/` - configuration primitives and environment variable interpolation
//! - `metrics/` - metric events and the Prometheus exporter
//! - `signal` - signal handling for cancelling a run
//! - `tracing` - log subscriber setup
//! - `error` - config and metrics error types

pub mod config;
pub mod error;
pub mod metrics;
pub mod signal;
pub mod tracing;

pub use crate::config::{
    InterpolationResult, KB, MB, MetricsConfig, ParquetCompression, interpolate, load_yaml,
    parse_yaml,
};
pub use crate::error::{ConfigError, MetricsError};
pub use crate::metrics::{
    DEFAULT_METRICS_ADDR, MetricsController, init_global as init_metrics,
    init_test as init_metrics_test,
};
pub use crate::signal::{cancel_on_shutdown, shutdown_signal};
pub use crate::tracing::init_tracing;
