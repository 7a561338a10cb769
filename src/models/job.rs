use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a scan job.
///
/// `Processing` is the only non-terminal state. A job leaves it exactly once,
/// either because an upload failed or because the workflow called back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

/// A scan job tracked by the registry.
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub result: Option<serde_json::Value>,
    /// Set while the creating request is still uploading; such jobs are
    /// never evicted.
    pub submitting: bool,
    pub updated_at: DateTime<Utc>,
}

impl ScanJob {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            status: JobStatus::Processing,
            result: None,
            submitting: true,
            updated_at: Utc::now(),
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            status: self.status,
            result: self.result.clone(),
        }
    }
}

/// What a poller sees: `{"status": ..., "result": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub result: Option<serde_json::Value>,
}

/// Per-status job totals, reported by `/health`.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct JobCounts {
    pub processing: usize,
    pub complete: usize,
    pub failed: usize,
}

impl JobCounts {
    pub fn total(&self) -> usize {
        self.processing + self.complete + self.failed
    }
}
