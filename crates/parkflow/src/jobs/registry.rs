//! In-memory registry of import jobs.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use snafu::prelude::*;

use crate::error::{JobError, NotFoundSnafu};

use super::record::{ImportJob, JobStatus};

/// Jobs returned by [`JobRegistry::list`].
pub const LIST_LIMIT: usize = 50;

struct Entry {
    /// Insertion order, breaks ties between equal creation times.
    seq: u64,
    job: ImportJob,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    jobs: HashMap<String, Entry>,
}

/// Shared, thread-safe job store. Clones refer to the same jobs.
///
/// Locks are held only for the duration of a lookup or an update closure and
/// never across an await.
#[derive(Clone, Default)]
pub struct JobRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new queued job.
    pub fn create(&self, total_bytes: Option<u64>) -> ImportJob {
        let job = ImportJob::new(total_bytes);
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.jobs.insert(
            job.id.clone(),
            Entry {
                seq,
                job: job.clone(),
            },
        );
        job
    }

    pub fn get(&self, id: &str) -> Option<ImportJob> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.jobs.get(id).map(|entry| entry.job.clone())
    }

    /// Most recently created jobs first, at most [`LIST_LIMIT`].
    pub fn list(&self) -> Vec<ImportJob> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<&Entry> = inner.jobs.values().collect();
        entries.sort_by(|a, b| {
            b.job
                .created_at
                .cmp(&a.job.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        entries
            .into_iter()
            .take(LIST_LIMIT)
            .map(|entry| entry.job.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .jobs
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `f` to the job in place and return the updated job.
    ///
    /// If `f` fails the job is left unchanged.
    pub fn update<F>(&self, id: &str, f: F) -> Result<ImportJob, JobError>
    where
        F: FnOnce(&mut ImportJob) -> Result<(), JobError>,
    {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let entry = inner
            .jobs
            .get_mut(id)
            .context(NotFoundSnafu { id })?;

        let mut job = entry.job.clone();
        f(&mut job)?;
        entry.job = job.clone();
        Ok(job)
    }

    /// Move a job to `status`.
    pub fn transition(&self, id: &str, status: JobStatus) -> Result<ImportJob, JobError> {
        self.update(id, |job| job.transition(status))
    }

    /// Mark a job failed, recording `message`.
    pub fn fail(&self, id: &str, message: impl Into<String>) -> Result<ImportJob, JobError> {
        let message = message.into();
        self.update(id, |job| job.fail(message))
    }
}
