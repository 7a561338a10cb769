use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::job::{JobCounts, JobStatus, ScanJob};

/// In-memory job table shared by the submission, callback and status paths.
///
/// All mutation happens under a single write lock, so two writers for the
/// same id are serialized and the later one wins.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, ScanJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-written job behind
    // (every update is a single field assignment), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, ScanJob>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, ScanJob>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new job in `processing`.
    pub fn create(&self, id: Uuid) -> Result<ScanJob, RegistryError> {
        let mut jobs = self.write();
        if jobs.contains_key(&id) {
            return Err(RegistryError::AlreadyExists(id));
        }
        let job = ScanJob::new(id);
        jobs.insert(id, job.clone());
        Ok(job)
    }

    /// Current state of a job, if it is known.
    pub fn get(&self, id: Uuid) -> Option<ScanJob> {
        self.read().get(&id).cloned()
    }

    /// Move a `processing` job to `failed`.
    pub fn mark_failed(&self, id: Uuid) -> Result<(), RegistryError> {
        let mut jobs = self.write();
        let job = jobs.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        if job.status.is_terminal() {
            return Err(RegistryError::Terminal {
                id,
                status: job.status,
            });
        }
        job.status = JobStatus::Failed;
        job.submitting = false;
        job.updated_at = Utc::now();
        Ok(())
    }

    /// Release the eviction pin once the creating request has stored every
    /// image. The expiry clock restarts here.
    pub fn finish_submission(&self, id: Uuid) -> Result<(), RegistryError> {
        let mut jobs = self.write();
        let job = jobs.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        job.submitting = false;
        job.updated_at = Utc::now();
        Ok(())
    }

    /// Store a workflow result and move the job to `complete`.
    ///
    /// A job that is already complete has its result replaced.
    pub fn mark_complete(
        &self,
        id: Uuid,
        result: serde_json::Value,
    ) -> Result<ScanJob, RegistryError> {
        let mut jobs = self.write();
        let job = jobs.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        if job.status == JobStatus::Failed {
            return Err(RegistryError::Terminal {
                id,
                status: job.status,
            });
        }
        job.status = JobStatus::Complete;
        job.result = Some(result);
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    /// Drop every job last touched before `cutoff`, except jobs whose
    /// submission is still in flight. Returns how many were removed.
    pub fn evict_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.write();
        let before = jobs.len();
        jobs.retain(|_, job| job.submitting || job.updated_at >= cutoff);
        before - jobs.len()
    }

    pub fn counts(&self) -> JobCounts {
        self.read()
            .values()
            .fold(JobCounts::default(), |mut counts, job| {
                match job.status {
                    JobStatus::Processing => counts.processing += 1,
                    JobStatus::Complete => counts.complete += 1,
                    JobStatus::Failed => counts.failed += 1,
                }
                counts
            })
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("job already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("job not found: {0}")]
    NotFound(Uuid),

    #[error("job {id} is already {status}")]
    Terminal { id: Uuid, status: JobStatus },
}
