//! Sink components for writing partitioned Parquet files.

mod batch;
mod pool;
mod writer;

pub use batch::{TransactionBatchBuilder, transaction_schema};
pub use pool::{DEFAULT_MAX_OPEN_WRITERS, PoolStats, WriterPool, part_file_name};
pub use writer::{ClosedFile, PartitionWriter, PartitionWriterConfig};
