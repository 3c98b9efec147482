//! Import job runner: stage an uploaded CSV body, then convert it.
//!
//! A job moves `uploading -> converting -> completed`, or to `failed` with the
//! error message as soon as staging or conversion fails. Conversion progress
//! is written back to the registry as it happens.

use std::path::{Path, PathBuf};

use snafu::prelude::*;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::record::{ImportJob, JobStatus};
use super::registry::JobRegistry;
use crate::error::{JobError, StageSnafu};
use crate::pipeline::{IngestOptions, ProgressSnapshot, ingest_file};

/// Runs import jobs against a registry.
#[derive(Clone)]
pub struct ImportRunner {
    registry: JobRegistry,
    uploads_dir: PathBuf,
    partitions_dir: PathBuf,
    options: IngestOptions,
}

impl ImportRunner {
    pub fn new(
        registry: JobRegistry,
        uploads_dir: impl Into<PathBuf>,
        partitions_dir: impl Into<PathBuf>,
        options: IngestOptions,
    ) -> Self {
        Self {
            registry,
            uploads_dir: uploads_dir.into(),
            partitions_dir: partitions_dir.into(),
            options,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Create a job for `body` and run it to completion.
    pub async fn submit<R>(
        &self,
        body: R,
        total_bytes: Option<u64>,
        shutdown: CancellationToken,
    ) -> Result<ImportJob, JobError>
    where
        R: AsyncRead + Unpin,
    {
        let job = self.registry.create(total_bytes);
        self.run(&job.id, body, shutdown).await
    }

    /// Stage and convert the body of an existing queued job.
    ///
    /// On failure the job is left `failed` with the error message and the
    /// error is returned as well.
    pub async fn run<R>(
        &self,
        id: &str,
        body: R,
        shutdown: CancellationToken,
    ) -> Result<ImportJob, JobError>
    where
        R: AsyncRead + Unpin,
    {
        let input_csv_path = self.uploads_dir.join(format!("{id}.csv"));
        let output_dir = self.partitions_dir.join(id);

        let job = self.registry.update(id, |job| {
            job.transition(JobStatus::Uploading)?;
            job.input_csv_path = Some(input_csv_path.clone());
            job.output_dir = Some(output_dir.clone());
            Ok(())
        })?;
        info!(target = %id, path = %input_csv_path.display(), "Staging upload");

        if let Err(e) = self.stage(id, body, &input_csv_path).await {
            return Err(self.mark_failed(id, e));
        }

        if let Err(e) = self.registry.transition(id, JobStatus::Converting) {
            return Err(self.mark_failed(id, e));
        }
        info!(target = %id, output = %output_dir.display(), "Converting upload");

        let options = self
            .options
            .clone()
            .with_target(id)
            .with_total_bytes(job.total_bytes);
        let registry = self.registry.clone();
        let job_id = id.to_string();
        let mut progress = move |snapshot: ProgressSnapshot| {
            let _ = registry.update(&job_id, |job| {
                job.processed_rows = Some(snapshot.processed);
                job.failed_rows = Some(snapshot.failed);
                Ok(())
            });
        };

        match ingest_file(&input_csv_path, &output_dir, &options, &mut progress, shutdown).await {
            Ok(summary) => self.registry.update(id, |job| {
                job.processed_rows = Some(summary.processed);
                job.failed_rows = Some(summary.failed);
                job.transition(JobStatus::Completed)
            }),
            Err(e) => Err(self.mark_failed(id, e.into())),
        }
    }

    async fn stage<R>(&self, id: &str, mut body: R, path: &Path) -> Result<(), JobError>
    where
        R: AsyncRead + Unpin,
    {
        let display = path.display().to_string();
        for dir in [&self.uploads_dir, &self.partitions_dir] {
            tokio::fs::create_dir_all(dir).await.context(StageSnafu {
                path: dir.display().to_string(),
            })?;
        }

        let mut file = tokio::fs::File::create(path).await.context(StageSnafu {
            path: display.clone(),
        })?;
        let mut chunk = vec![0u8; self.options.source.chunk_size_bytes.max(1)];

        loop {
            let n = body.read(&mut chunk).await.context(StageSnafu {
                path: display.clone(),
            })?;
            if n == 0 {
                break;
            }
            file.write_all(&chunk[..n]).await.context(StageSnafu {
                path: display.clone(),
            })?;
            self.registry.update(id, |job| {
                job.bytes_received += n as u64;
                Ok(())
            })?;
        }

        file.flush().await.context(StageSnafu { path: display })?;
        Ok(())
    }

    fn mark_failed(&self, id: &str, error: JobError) -> JobError {
        warn!(target = %id, error = %error, "Import job failed");
        if let Err(e) = self.registry.fail(id, error.to_string()) {
            warn!(target = %id, error = %e, "Failed to record job failure");
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::TempDir;
    use tokio::io::ReadBuf;

    const CSV: &str = "ID,Source,Duration in Minutes,Start Time,End Time,Amount,Kiosk ID,App Zone ID,App Zone Group,Payment Method,Location Group,Last Updated\n\
        1,Parking Meter,60,01/14/2017 10:00:00 AM,01/14/2017 11:00:00 AM,2.50,K1,,,CARD,,01/14/2017 11:00:00 AM\n\
        2,Parking Meter,60,01/15/2017 10:00:00 AM,01/15/2017 11:00:00 AM,abc,K1,,,CARD,,01/15/2017 11:00:00 AM\n";

    fn runner(dir: &TempDir) -> ImportRunner {
        ImportRunner::new(
            JobRegistry::new(),
            dir.path().join("uploads"),
            dir.path().join("data").join("partitions"),
            IngestOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_job_completes_with_counts() {
        let dir = TempDir::new().unwrap();
        let runner = runner(&dir);

        let job = runner
            .submit(CSV.as_bytes(), Some(CSV.len() as u64), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.bytes_received, CSV.len() as u64);
        assert_eq!(job.processed_rows, Some(1));
        assert_eq!(job.failed_rows, Some(1));
        assert!(job.input_csv_path.as_ref().unwrap().exists());

        let output = job.output_dir.unwrap();
        assert!(output.join("2017/01/14/part-00001.parquet").exists());
        assert_eq!(runner.registry().get(&job.id).unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancelled_conversion_marks_job_failed() {
        let dir = TempDir::new().unwrap();
        let runner = runner(&dir);
        let token = CancellationToken::new();
        token.cancel();

        let job = runner.registry().create(None);
        let err = runner
            .run(&job.id, CSV.as_bytes(), token)
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Ingest { .. }));

        let stored = runner.registry().get(&job.id).unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert!(stored.error.unwrap().contains("aborted"));
    }

    #[tokio::test]
    async fn test_job_must_be_queued() {
        let dir = TempDir::new().unwrap();
        let runner = runner(&dir);
        let job = runner.registry().create(None);
        runner.registry().fail(&job.id, "gave up").unwrap();

        let err = runner
            .run(&job.id, CSV.as_bytes(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition { .. }));
    }

    /// Body that moves its own job forward once it has been fully read.
    struct SelfAdvancingBody {
        data: &'static [u8],
        registry: JobRegistry,
        id: String,
    }

    impl AsyncRead for SelfAdvancingBody {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            let data = self.data;
            if data.is_empty() {
                let _ = self.registry.transition(&self.id, JobStatus::Converting);
                return Poll::Ready(Ok(()));
            }
            let n = buf.remaining().min(data.len());
            buf.put_slice(&data[..n]);
            self.data = &data[n..];
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_failed_conversion_transition_marks_job_failed() {
        let dir = TempDir::new().unwrap();
        let runner = runner(&dir);
        let job = runner.registry().create(None);

        let body = SelfAdvancingBody {
            data: CSV.as_bytes(),
            registry: runner.registry().clone(),
            id: job.id.clone(),
        };
        let err = runner
            .run(&job.id, body, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition { .. }));

        let stored = runner.registry().get(&job.id).unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert!(stored.error.is_some());
    }
}
