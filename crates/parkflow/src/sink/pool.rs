//! Bounded pool of open partition writers.
//!
//! The pool holds at most `max_open_writers` files open at once. Every access
//! stamps the handle with a tick from a logical clock; when a new partition
//! needs a handle and the pool is full, the handle with the smallest stamp is
//! closed first. A partition that comes back after eviction gets the next
//! numbered part file rather than reopening (and truncating) the old one.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use arrow::datatypes::SchemaRef;
use snafu::prelude::*;
use tracing::{debug, warn};

use parkflow_core::emit;
use parkflow_core::metrics::events::{
    OpenPartitionWriters, PartitionFileClosed, PartitionWriterEvicted, PartitionWriterOpened,
};

use super::writer::{ClosedFile, PartitionWriter, PartitionWriterConfig};
use crate::error::{CreateDirSnafu, PoolClosedSnafu, WriterError};
use crate::partition::PartitionKey;
use crate::schema::TransactionRecord;

/// Default cap on simultaneously open partition files.
pub const DEFAULT_MAX_OPEN_WRITERS: usize = 16;

/// Counters describing what a pool has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Distinct partitions that received a writer.
    pub partitions: usize,
    /// Partition files closed, through eviction or `close_all`.
    pub files_written: u64,
    /// Handles closed to stay under the cap.
    pub evictions: u64,
}

struct PoolEntry {
    writer: PartitionWriter,
    last_used: u64,
}

/// Open writers keyed by partition, with least-recently-used eviction.
pub struct WriterPool {
    root: PathBuf,
    schema: SchemaRef,
    config: PartitionWriterConfig,
    max_open_writers: usize,
    writers: HashMap<PartitionKey, PoolEntry>,
    /// Part files opened so far per partition.
    parts: HashMap<PartitionKey, u32>,
    clock: u64,
    stats: PoolStats,
    closed: bool,
    target: String,
}

impl WriterPool {
    /// Create an empty pool writing under `root`.
    ///
    /// A `max_open_writers` of zero is treated as one.
    pub fn new(
        root: impl Into<PathBuf>,
        schema: SchemaRef,
        config: PartitionWriterConfig,
        max_open_writers: usize,
        target: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            schema,
            config,
            max_open_writers: max_open_writers.max(1),
            writers: HashMap::new(),
            parts: HashMap::new(),
            clock: 0,
            stats: PoolStats::default(),
            closed: false,
            target: target.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_open_writers(&self) -> usize {
        self.max_open_writers
    }

    /// Number of currently open handles.
    pub fn open_count(&self) -> usize {
        self.writers.len()
    }

    /// Whether `key` currently has an open handle.
    pub fn is_open(&self, key: &PartitionKey) -> bool {
        self.writers.contains_key(key)
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Return the open handle for `key`, opening one if necessary.
    ///
    /// Opening creates the partition directory if needed. When the pool is
    /// already full, the least recently used handle is closed before the new
    /// one is registered, so the open count never exceeds the cap and the
    /// new handle can never be the one evicted.
    pub async fn get_writer(
        &mut self,
        key: &PartitionKey,
    ) -> Result<&mut PartitionWriter, WriterError> {
        ensure!(!self.closed, PoolClosedSnafu);

        self.clock += 1;
        let tick = self.clock;

        if !self.writers.contains_key(key) && self.writers.len() >= self.max_open_writers {
            self.evict_lru().await?;
        }

        let open_before = self.writers.len();
        let entry = match self.writers.entry(key.clone()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                let part = self.parts.entry(key.clone()).or_insert(0);
                *part += 1;
                let writer =
                    open_writer(&self.root, &self.schema, &self.config, key, *part).await?;

                self.stats.partitions = self.parts.len();
                emit!(PartitionWriterOpened {
                    target: self.target.clone(),
                });
                emit!(OpenPartitionWriters {
                    count: open_before + 1,
                    target: self.target.clone(),
                });

                vacant.insert(PoolEntry {
                    writer,
                    last_used: tick,
                })
            }
        };

        entry.last_used = tick;
        Ok(&mut entry.writer)
    }

    /// Append a record to the partition's writer.
    pub async fn append(
        &mut self,
        key: &PartitionKey,
        record: &TransactionRecord,
    ) -> Result<(), WriterError> {
        self.get_writer(key).await?.append(record).await
    }

    /// Close the handle with the smallest use stamp.
    async fn evict_lru(&mut self) -> Result<(), WriterError> {
        let Some(victim) = self
            .writers
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone())
        else {
            return Ok(());
        };

        let Some(entry) = self.writers.remove(&victim) else {
            return Ok(());
        };

        debug!(
            partition = %victim,
            last_used = entry.last_used,
            open = self.writers.len(),
            "Evicting least recently used partition writer"
        );
        self.stats.evictions += 1;
        emit!(PartitionWriterEvicted {
            target: self.target.clone(),
        });

        let closed = entry.writer.close().await?;
        self.record_closed(&closed);
        Ok(())
    }

    /// Flush and close every open handle.
    ///
    /// Every handle is closed even if some fail; the first failure is
    /// returned. The pool rejects further use afterwards.
    pub async fn close_all(&mut self) -> Result<(), WriterError> {
        self.closed = true;

        let mut entries: Vec<(PartitionKey, PoolEntry)> = self.writers.drain().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut first_error = None;
        for (key, entry) in entries {
            match entry.writer.close().await {
                Ok(closed) => self.record_closed(&closed),
                Err(e) => {
                    warn!(partition = %key, error = %e, "Failed to close partition writer");
                    first_error.get_or_insert(e);
                }
            }
        }

        emit!(OpenPartitionWriters {
            count: 0,
            target: self.target.clone(),
        });

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn record_closed(&mut self, closed: &ClosedFile) {
        self.stats.files_written += 1;
        emit!(PartitionFileClosed {
            duration: closed.duration,
            rows: closed.rows,
            target: self.target.clone(),
        });
        emit!(OpenPartitionWriters {
            count: self.writers.len(),
            target: self.target.clone(),
        });
    }
}

async fn open_writer(
    root: &Path,
    schema: &SchemaRef,
    config: &PartitionWriterConfig,
    key: &PartitionKey,
    part: u32,
) -> Result<PartitionWriter, WriterError> {
    let dir = key.dir_in(root);
    tokio::fs::create_dir_all(&dir)
        .await
        .context(CreateDirSnafu {
            path: dir.display().to_string(),
        })?;

    let path = dir.join(part_file_name(part));
    PartitionWriter::create(key.clone(), path, schema.clone(), config).await
}

/// File name of the `part`-th file written to a partition, counting from 1.
pub fn part_file_name(part: u32) -> String {
    format!("part-{part:05}.parquet")
}
