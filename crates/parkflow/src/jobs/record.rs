//! Import job records and their status lifecycle.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{InvalidTransitionSnafu, JobError};

/// Where an import job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Uploading,
    Converting,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Uploading => "uploading",
            JobStatus::Converting => "converting",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Completed and failed jobs never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether a job may move from `self` to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Queued, JobStatus::Uploading)
            | (JobStatus::Uploading, JobStatus::Converting)
            | (JobStatus::Converting, JobStatus::Completed) => true,
            (current, JobStatus::Failed) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One CSV import: upload staging followed by conversion to partitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub bytes_received: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_csv_path: Option<PathBuf>,
}

impl ImportJob {
    /// A new queued job with a random id.
    pub fn new(total_bytes: Option<u64>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            status: JobStatus::Queued,
            error: None,
            bytes_received: 0,
            total_bytes,
            processed_rows: None,
            failed_rows: None,
            output_dir: None,
            input_csv_path: None,
        }
    }

    /// Move to `to`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&mut self, to: JobStatus) -> Result<(), JobError> {
        ensure_transition(self.status, to)?;
        self.status = to;
        Ok(())
    }

    /// Mark the job failed with `message`.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), JobError> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(message.into());
        Ok(())
    }
}

fn ensure_transition(from: JobStatus, to: JobStatus) -> Result<(), JobError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        InvalidTransitionSnafu { from, to }.fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut job = ImportJob::new(Some(10));
        assert_eq!(job.status, JobStatus::Queued);
        job.transition(JobStatus::Uploading).unwrap();
        job.transition(JobStatus::Converting).unwrap();
        job.transition(JobStatus::Completed).unwrap();
        assert!(job.status.is_terminal());
    }

    #[test]
    fn test_failed_from_any_non_terminal_state() {
        for status in [JobStatus::Queued, JobStatus::Uploading, JobStatus::Converting] {
            assert!(status.can_transition_to(JobStatus::Failed), "{status}");
        }
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Failed));

        let mut job = ImportJob::new(None);
        job.fail("Missing request body").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("Missing request body"));
    }

    #[test]
    fn test_rejects_skipping_and_going_back() {
        let mut job = ImportJob::new(None);
        let err = job.transition(JobStatus::Converting).unwrap_err();
        assert!(matches!(
            err,
            JobError::InvalidTransition {
                from: JobStatus::Queued,
                to: JobStatus::Converting
            }
        ));
        assert_eq!(err.to_string(), "Cannot move job from queued to converting");

        job.transition(JobStatus::Uploading).unwrap();
        job.transition(JobStatus::Converting).unwrap();
        assert!(job.transition(JobStatus::Uploading).is_err());
        assert_eq!(job.status, JobStatus::Converting);
    }

    #[test]
    fn test_serializes_like_status_object() {
        let mut job = ImportJob::new(Some(42));
        job.transition(JobStatus::Uploading).unwrap();
        let json = serde_json::to_value(&job).unwrap();

        assert_eq!(json["status"], "uploading");
        assert_eq!(json["bytesReceived"], 0);
        assert_eq!(json["totalBytes"], 42);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("processedRows").is_none());
        assert!(json.get("error").is_none());
    }
}
